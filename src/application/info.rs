use crate::application::unit_of_work::{finish, with_deadline};
use crate::config::LedgerConfig;
use crate::domain::account::UserId;
use crate::domain::info::{CoinHistory, UserInfo};
use crate::domain::ports::{InfoStore, InfoUnit};
use crate::error::{Entity, LedgerError, Result};
use std::sync::Arc;
use tracing::debug;

/// Reads balance, inventory and transfer history from one snapshot, so the
/// four parts always describe the same commit point.
pub struct InfoAggregator {
    store: Arc<dyn InfoStore>,
    config: LedgerConfig,
}

impl InfoAggregator {
    pub fn new(store: Arc<dyn InfoStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub async fn user_info(&self, user: UserId) -> Result<UserInfo> {
        with_deadline(self.config.operation_timeout, async {
            let mut unit = self.store.begin_snapshot().await?;
            let outcome = collect(unit.as_mut(), user).await;
            finish(unit, outcome).await
        })
        .await
    }
}

async fn collect(unit: &mut dyn InfoUnit, user: UserId) -> Result<UserInfo> {
    let coins = unit
        .balance(user)
        .await?
        .ok_or(LedgerError::NotFound(Entity::User))?;
    let inventory = unit.inventory(user).await?;
    let received = unit.received(user).await?;
    let sent = unit.sent(user).await?;
    debug!(
        user = %user,
        items = inventory.len(),
        received = received.len(),
        sent = sent.len(),
        "user info collected"
    );

    Ok(UserInfo {
        coins: coins.value(),
        inventory,
        coin_history: CoinHistory { received, sent },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Coins, NewUser};
    use crate::domain::ports::UserStore;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;

    #[tokio::test]
    async fn test_fresh_user_has_empty_history() {
        let store = InMemoryLedgerStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                password_hash: String::new(),
                balance: Coins(1000),
            })
            .await
            .unwrap();
        let aggregator = InfoAggregator::new(Arc::new(store), LedgerConfig::default());

        let info = aggregator.user_info(user.id).await.unwrap();
        assert_eq!(info.coins, 1000);
        assert!(info.inventory.is_empty());
        assert!(info.coin_history.received.is_empty());
        assert!(info.coin_history.sent.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let aggregator =
            InfoAggregator::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default());
        assert!(matches!(
            aggregator.user_info(UserId(5)).await,
            Err(LedgerError::NotFound(Entity::User))
        ));
    }
}
