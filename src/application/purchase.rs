use crate::application::unit_of_work::{finish, with_deadline};
use crate::config::LedgerConfig;
use crate::domain::account::UserId;
use crate::domain::info::PurchaseReceipt;
use crate::domain::item::ItemId;
use crate::domain::ports::{PurchaseStore, PurchaseUnit};
use crate::error::{Entity, LedgerError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Debits a buyer and credits their inventory in one unit of work.
///
/// Purchases leave no entry in the transfer log.
pub struct PurchaseEngine {
    store: Arc<dyn PurchaseStore>,
    config: LedgerConfig,
}

impl PurchaseEngine {
    pub fn new(store: Arc<dyn PurchaseStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub async fn buy_item(&self, user: UserId, item: ItemId) -> Result<PurchaseReceipt> {
        let result = with_deadline(self.config.operation_timeout, async {
            let mut unit = self.store.begin_purchase().await?;
            let outcome = purchase(unit.as_mut(), user, item).await;
            finish(unit, outcome).await
        })
        .await;

        match &result {
            Ok(receipt) => info!(
                user = %user,
                item_id = receipt.item_id,
                item = %receipt.item,
                price = receipt.price,
                balance = receipt.balance,
                quantity = receipt.quantity,
                "item purchased"
            ),
            Err(err) => warn!(user = %user, item = %item, error = %err, "purchase rejected"),
        }
        result
    }
}

async fn purchase(
    unit: &mut dyn PurchaseUnit,
    user: UserId,
    item: ItemId,
) -> Result<PurchaseReceipt> {
    let item = unit
        .item(item)
        .await?
        .ok_or(LedgerError::NotFound(Entity::Item))?;

    let balance = unit.lock_balance(user).await?;
    let remaining = balance.debit(item.price)?;
    unit.set_balance(user, remaining).await?;
    let quantity = unit.add_to_inventory(user, item.id).await?;

    Ok(PurchaseReceipt {
        item_id: item.id.0,
        item: item.name,
        price: item.price.value(),
        balance: remaining.value(),
        quantity,
    })
}
