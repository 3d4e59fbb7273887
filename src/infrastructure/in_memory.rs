use crate::domain::account::{Coins, NewUser, User, UserId};
use crate::domain::info::{InventoryItem, ReceivedTransfer, SentTransfer};
use crate::domain::item::{Item, ItemId};
use crate::domain::ports::{
    BalanceRows, InfoStore, InfoUnit, PurchaseStore, PurchaseUnit, TransferStore, TransferUnit,
    UnitOfWork, UserStore,
};
use crate::domain::transaction::{NewTransaction, Transaction};
use crate::error::{ConflictKind, Entity, LedgerError, Result};
use crate::infrastructure::row_locks::{HeldLocks, RowLocks};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::debug;

#[derive(Default)]
struct LedgerState {
    users: BTreeMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    items: BTreeMap<ItemId, Item>,
    inventory: BTreeMap<(UserId, ItemId), u32>,
    transactions: Vec<Transaction>,
}

impl LedgerState {
    fn username(&self, user: UserId) -> String {
        self.users
            .get(&user)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }
}

/// A thread-safe in-memory ledger.
///
/// Committed state lives behind one `Arc<RwLock<..>>`: commits take the write
/// side, snapshots hold the read side for their whole lifetime. Balance rows
/// are additionally guarded by a [`RowLocks`] table so concurrent transfers
/// and purchases on the same account serialize.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    rows: Arc<RowLocks>,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::with_catalog(Item::merch_catalog())
    }
}

impl InMemoryLedgerStore {
    /// Creates an empty ledger selling the default merch catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: impl IntoIterator<Item = Item>) -> Self {
        let state = LedgerState {
            items: catalog.into_iter().map(|item| (item.id, item)).collect(),
            ..LedgerState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            rows: Arc::new(RowLocks::new()),
        }
    }

    /// Every committed transfer, oldest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.read().await.transactions.clone()
    }

    fn write_unit(&self) -> InMemoryWriteUnit {
        InMemoryWriteUnit {
            state: Arc::clone(&self.state),
            rows: Arc::clone(&self.rows),
            held: HeldLocks::new(),
            balances: BTreeMap::new(),
            inventory: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryLedgerStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.usernames.contains_key(&user.username) {
            return Err(LedgerError::Conflict(ConflictKind::UsernameExists));
        }
        let id = UserId(state.users.keys().next_back().map_or(1, |last| last.0 + 1));
        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            balance: user.balance,
        };
        state.usernames.insert(created.username.clone(), id);
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .usernames
            .get(username)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().cloned().collect())
    }
}

#[async_trait]
impl TransferStore for InMemoryLedgerStore {
    async fn begin_transfer(&self) -> Result<Box<dyn TransferUnit>> {
        Ok(Box::new(self.write_unit()))
    }
}

#[async_trait]
impl PurchaseStore for InMemoryLedgerStore {
    async fn begin_purchase(&self) -> Result<Box<dyn PurchaseUnit>> {
        Ok(Box::new(self.write_unit()))
    }
}

#[async_trait]
impl InfoStore for InMemoryLedgerStore {
    async fn begin_snapshot(&self) -> Result<Box<dyn InfoUnit>> {
        let snapshot = Arc::clone(&self.state).read_owned().await;
        Ok(Box::new(InMemorySnapshot { snapshot }))
    }
}

/// A mutating unit of work. Writes are buffered until commit.
struct InMemoryWriteUnit {
    state: Arc<RwLock<LedgerState>>,
    rows: Arc<RowLocks>,
    held: HeldLocks,
    balances: BTreeMap<UserId, Coins>,
    inventory: BTreeMap<(UserId, ItemId), u32>,
    transactions: Vec<NewTransaction>,
}

#[async_trait]
impl UnitOfWork for InMemoryWriteUnit {
    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryWriteUnit {
            state,
            held,
            balances,
            inventory,
            transactions,
            ..
        } = *self;
        let mut state = state.write().await;
        if balances.keys().any(|user| !state.users.contains_key(user)) {
            return Err(LedgerError::NotFound(Entity::User));
        }
        for (user, balance) in &balances {
            if let Some(row) = state.users.get_mut(user) {
                row.balance = *balance;
            }
        }
        for (key, quantity) in &inventory {
            state.inventory.insert(*key, *quantity);
        }
        let now = Utc::now();
        for tx in transactions {
            let id = state.transactions.len() as u64 + 1;
            state.transactions.push(tx.commit_as(id, now));
        }
        drop(state);
        drop(held);
        debug!(
            balances = balances.len(),
            inventory = inventory.len(),
            "in-memory unit committed"
        );
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        drop(self);
        Ok(())
    }
}

#[async_trait]
impl BalanceRows for InMemoryWriteUnit {
    async fn lock_balance(&mut self, user: UserId) -> Result<Coins> {
        if !self.state.read().await.users.contains_key(&user) {
            return Err(LedgerError::NotFound(Entity::User));
        }
        self.held.lock(&self.rows, user).await?;
        if let Some(pending) = self.balances.get(&user) {
            return Ok(*pending);
        }
        let state = self.state.read().await;
        state
            .users
            .get(&user)
            .map(|u| u.balance)
            .ok_or(LedgerError::NotFound(Entity::User))
    }

    async fn set_balance(&mut self, user: UserId, balance: Coins) -> Result<()> {
        self.held.ensure_held(user)?;
        self.balances.insert(user, balance);
        Ok(())
    }
}

#[async_trait]
impl TransferUnit for InMemoryWriteUnit {
    async fn find_user_id(&mut self, username: &str) -> Result<Option<UserId>> {
        Ok(self.state.read().await.usernames.get(username).copied())
    }

    async fn append_transaction(&mut self, tx: NewTransaction) -> Result<()> {
        self.transactions.push(tx);
        Ok(())
    }
}

#[async_trait]
impl PurchaseUnit for InMemoryWriteUnit {
    async fn item(&mut self, item: ItemId) -> Result<Option<Item>> {
        Ok(self.state.read().await.items.get(&item).cloned())
    }

    async fn add_to_inventory(&mut self, user: UserId, item: ItemId) -> Result<u32> {
        self.held.ensure_held(user)?;
        let current = match self.inventory.get(&(user, item)) {
            Some(pending) => *pending,
            None => self
                .state
                .read()
                .await
                .inventory
                .get(&(user, item))
                .copied()
                .unwrap_or(0),
        };
        let quantity = current
            .checked_add(1)
            .ok_or_else(|| LedgerError::internal("inventory quantity overflow"))?;
        self.inventory.insert((user, item), quantity);
        Ok(quantity)
    }
}

/// A read-only unit pinned to the state as of its creation.
struct InMemorySnapshot {
    snapshot: OwnedRwLockReadGuard<LedgerState>,
}

#[async_trait]
impl UnitOfWork for InMemorySnapshot {
    async fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl InfoUnit for InMemorySnapshot {
    async fn balance(&mut self, user: UserId) -> Result<Option<Coins>> {
        Ok(self.snapshot.users.get(&user).map(|u| u.balance))
    }

    async fn inventory(&mut self, user: UserId) -> Result<Vec<InventoryItem>> {
        let state = &*self.snapshot;
        Ok(state
            .inventory
            .range((user, ItemId(0))..=(user, ItemId(u64::MAX)))
            .filter_map(|((_, item), quantity)| {
                state.items.get(item).map(|item| InventoryItem {
                    item_type: item.name.clone(),
                    quantity: *quantity,
                })
            })
            .collect())
    }

    async fn received(&mut self, user: UserId) -> Result<Vec<ReceivedTransfer>> {
        let state = &*self.snapshot;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.receiver == user)
            .map(|tx| ReceivedTransfer {
                from_user: state.username(tx.sender),
                amount: tx.amount.value(),
            })
            .collect())
    }

    async fn sent(&mut self, user: UserId) -> Result<Vec<SentTransfer>> {
        let state = &*self.snapshot;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.sender == user)
            .map(|tx| SentTransfer {
                to_user: state.username(tx.receiver),
                amount: tx.amount.value(),
            })
            .collect())
    }
}
