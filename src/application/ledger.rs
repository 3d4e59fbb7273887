use crate::application::info::InfoAggregator;
use crate::application::purchase::PurchaseEngine;
use crate::application::registration::AccountRegistrar;
use crate::application::transfer::TransferEngine;
use crate::config::LedgerConfig;
use crate::domain::account::{User, UserId};
use crate::domain::info::{PurchaseReceipt, UserInfo};
use crate::domain::item::ItemId;
use crate::domain::ports::{
    InfoStore, PurchaseStore, StorageHandle, TransferStore, UserStore,
};
use crate::domain::transaction::NewTransaction;
use crate::error::Result;
use std::sync::Arc;

/// The entry point the boundary layer talks to.
///
/// `Ledger` wires every engine to one shared storage backend and one
/// configuration value. It holds no domain state of its own: every call runs
/// its own unit of work against the store, so a single `Ledger` can be shared
/// across tasks behind an `Arc`.
pub struct Ledger {
    users: Arc<dyn UserStore>,
    registrar: AccountRegistrar,
    transfers: TransferEngine,
    purchases: PurchaseEngine,
    info: InfoAggregator,
}

impl Ledger {
    /// Creates a new `Ledger` over `storage`.
    ///
    /// # Arguments
    ///
    /// * `storage` - The backend holding users, items, inventory and transfers.
    /// * `config` - Settings shared by every engine.
    pub fn new(storage: StorageHandle, config: LedgerConfig) -> Self {
        let users: Arc<dyn UserStore> = storage.clone();
        let transfers: Arc<dyn TransferStore> = storage.clone();
        let purchases: Arc<dyn PurchaseStore> = storage.clone();
        let info: Arc<dyn InfoStore> = storage;
        Self {
            registrar: AccountRegistrar::new(Arc::clone(&users), config.clone()),
            users,
            transfers: TransferEngine::new(transfers, config.clone()),
            purchases: PurchaseEngine::new(purchases, config.clone()),
            info: InfoAggregator::new(info, config),
        }
    }

    pub async fn register(&self, username: &str, password_hash: &str) -> Result<User> {
        self.registrar.register(username, password_hash).await
    }

    /// Resolves a username to the account it names.
    pub async fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.users.find_by_username(username).await
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.users.list_users().await
    }

    pub async fn send_coins(
        &self,
        sender: UserId,
        receiver: &str,
        amount: i64,
    ) -> Result<NewTransaction> {
        self.transfers.send_coins(sender, receiver, amount).await
    }

    pub async fn buy_item(&self, user: UserId, item: ItemId) -> Result<PurchaseReceipt> {
        self.purchases.buy_item(user, item).await
    }

    pub async fn user_info(&self, user: UserId) -> Result<UserInfo> {
        self.info.user_info(user).await
    }
}
