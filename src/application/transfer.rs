use crate::application::unit_of_work::{finish, with_deadline};
use crate::config::LedgerConfig;
use crate::domain::account::{Amount, UserId};
use crate::domain::ports::{TransferStore, TransferUnit};
use crate::domain::transaction::NewTransaction;
use crate::error::{Entity, LedgerError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Moves coins between two accounts in a single unit of work.
///
/// Both balance rows are locked in ascending id order no matter which side
/// initiated the transfer, so two transfers between the same pair running in
/// opposite directions always queue on the same row first.
pub struct TransferEngine {
    store: Arc<dyn TransferStore>,
    config: LedgerConfig,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn TransferStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Sends `amount` coins from `sender` to the user called `receiver`.
    ///
    /// Returns the transfer as recorded; the store assigns its id and
    /// timestamp on commit. On any error nothing is written.
    /// Sending to oneself is rejected as a validation error.
    pub async fn send_coins(
        &self,
        sender: UserId,
        receiver: &str,
        amount: i64,
    ) -> Result<NewTransaction> {
        let amount = Amount::new(amount)?;
        let receiver = receiver.trim();
        if receiver.is_empty() {
            return Err(LedgerError::ValidationError(
                "Receiver username must not be empty".to_string(),
            ));
        }

        let result = with_deadline(self.config.operation_timeout, async {
            let mut unit = self.store.begin_transfer().await?;
            let outcome = transfer(unit.as_mut(), sender, receiver, amount).await;
            finish(unit, outcome).await
        })
        .await;

        match &result {
            Ok(tx) => info!(
                sender = %tx.sender,
                receiver = %tx.receiver,
                amount = amount.value(),
                "coins sent"
            ),
            Err(err) => warn!(
                sender = %sender,
                receiver,
                amount = amount.value(),
                error = %err,
                "transfer rejected"
            ),
        }
        result
    }
}

async fn transfer(
    unit: &mut dyn TransferUnit,
    sender: UserId,
    receiver_name: &str,
    amount: Amount,
) -> Result<NewTransaction> {
    let receiver = unit
        .find_user_id(receiver_name)
        .await?
        .ok_or(LedgerError::NotFound(Entity::User))?;
    if receiver == sender {
        return Err(LedgerError::ValidationError(
            "Cannot send coins to yourself".to_string(),
        ));
    }

    let (first, second) = if sender < receiver {
        (sender, receiver)
    } else {
        (receiver, sender)
    };
    let first_balance = unit.lock_balance(first).await?;
    let second_balance = unit.lock_balance(second).await?;
    let (sender_balance, receiver_balance) = if first == sender {
        (first_balance, second_balance)
    } else {
        (second_balance, first_balance)
    };

    let sender_after = sender_balance.debit(amount.into())?;
    let receiver_after = receiver_balance.credit(amount.into())?;
    unit.set_balance(sender, sender_after).await?;
    unit.set_balance(receiver, receiver_after).await?;

    let tx = NewTransaction {
        sender,
        receiver,
        amount,
    };
    unit.append_transaction(tx).await?;
    Ok(tx)
}
