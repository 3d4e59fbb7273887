//! Storage contract consumed by the ledger engines.
//!
//! Each engine opens a unit of work from its store, performs its reads and
//! writes through it, and finishes it with [`UnitOfWork::commit`] or
//! [`UnitOfWork::rollback`]. A unit that is dropped without committing must
//! behave like a rollback: its row locks are released and its writes are
//! discarded.

use super::account::{Coins, NewUser, User, UserId};
use super::info::{InventoryItem, ReceivedTransfer, SentTransfer};
use super::item::{Item, ItemId};
use super::transaction::NewTransaction;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait UnitOfWork: Send {
    /// Atomically applies every buffered write and releases the unit's locks.
    async fn commit(self: Box<Self>) -> Result<()>;
    /// Discards every buffered write and releases the unit's locks.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Row-level access to user balances.
///
/// `lock_balance` takes an exclusive lock on the user's balance row, held
/// until the unit finishes, and returns the balance as seen under that lock
/// (including writes already buffered by this unit).
#[async_trait]
pub trait BalanceRows: UnitOfWork {
    async fn lock_balance(&mut self, user: UserId) -> Result<Coins>;
    /// Buffers a new balance for a row this unit has locked.
    async fn set_balance(&mut self, user: UserId, balance: Coins) -> Result<()>;
}

#[async_trait]
pub trait TransferUnit: BalanceRows {
    async fn find_user_id(&mut self, username: &str) -> Result<Option<UserId>>;
    async fn append_transaction(&mut self, tx: NewTransaction) -> Result<()>;
}

#[async_trait]
pub trait PurchaseUnit: BalanceRows {
    async fn item(&mut self, item: ItemId) -> Result<Option<Item>>;
    /// Adds one unit of `item` to the user's inventory and returns the new
    /// quantity it will have once committed.
    async fn add_to_inventory(&mut self, user: UserId, item: ItemId) -> Result<u32>;
}

/// A read-only view pinned to a single commit point.
#[async_trait]
pub trait InfoUnit: UnitOfWork {
    async fn balance(&mut self, user: UserId) -> Result<Option<Coins>>;
    async fn inventory(&mut self, user: UserId) -> Result<Vec<InventoryItem>>;
    async fn received(&mut self, user: UserId) -> Result<Vec<ReceivedTransfer>>;
    async fn sent(&mut self, user: UserId) -> Result<Vec<SentTransfer>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn begin_transfer(&self) -> Result<Box<dyn TransferUnit>>;
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn begin_purchase(&self) -> Result<Box<dyn PurchaseUnit>>;
}

#[async_trait]
pub trait InfoStore: Send + Sync {
    async fn begin_snapshot(&self) -> Result<Box<dyn InfoUnit>>;
}

/// Everything a full ledger backend provides.
pub trait Storage: UserStore + TransferStore + PurchaseStore + InfoStore {}

impl<T> Storage for T where T: UserStore + TransferStore + PurchaseStore + InfoStore {}

pub type StorageHandle = Arc<dyn Storage>;
