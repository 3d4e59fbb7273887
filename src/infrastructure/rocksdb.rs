use crate::domain::account::{Coins, NewUser, User, UserId};
use crate::domain::info::{InventoryItem, ReceivedTransfer, SentTransfer};
use crate::domain::item::{InventoryEntry, Item, ItemId};
use crate::domain::ports::{
    BalanceRows, InfoStore, InfoUnit, PurchaseStore, PurchaseUnit, TransferStore, TransferUnit,
    UnitOfWork, UserStore,
};
use crate::domain::transaction::{NewTransaction, Transaction};
use crate::error::{ConflictKind, Entity, LedgerError, Result};
use crate::infrastructure::row_locks::{HeldLocks, RowLocks};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::{debug, info};

/// Column Family for user records, keyed by id.
pub const CF_USERS: &str = "users";
/// Column Family mapping usernames to user ids.
pub const CF_USERNAMES: &str = "usernames";
/// Column Family for catalog items.
pub const CF_ITEMS: &str = "items";
/// Column Family for inventory entries, keyed by (user, item).
pub const CF_INVENTORY: &str = "inventory";
/// Column Family for the append-only transfer log.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Index of transfers by sender, keyed by (user, transaction).
pub const CF_SENT: &str = "sent";
/// Index of transfers by receiver, keyed by (user, transaction).
pub const CF_RECEIVED: &str = "received";
/// Column Family for id sequences.
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 8] = [
    CF_USERS,
    CF_USERNAMES,
    CF_ITEMS,
    CF_INVENTORY,
    CF_TRANSACTIONS,
    CF_SENT,
    CF_RECEIVED,
    CF_META,
];

const NEXT_USER_ID: &[u8] = b"next_user_id";
const NEXT_TX_ID: &[u8] = b"next_tx_id";

/// A persistent ledger backed by RocksDB.
///
/// Every unit of work buffers its writes and applies them as one `WriteBatch`,
/// so a commit is all-or-nothing on disk. Commits hold the exclusive side of
/// `gate`; snapshots hold the shared side for their lifetime, which keeps
/// their reads on one commit point. Balance rows are locked through the
/// shared [`RowLocks`] table.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    rows: Arc<RowLocks>,
    gate: Arc<RwLock<()>>,
}

impl RocksDBStore {
    /// Opens or creates a ledger at `path` selling the default merch catalog.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_catalog(path, Item::merch_catalog())
    }

    /// Opens or creates a ledger at `path`, writing `catalog` as the item
    /// reference data.
    pub fn open_with_catalog<P: AsRef<Path>>(
        path: P,
        catalog: impl IntoIterator<Item = Item>,
    ) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path.as_ref(), descriptors)?;

        let mut batch = WriteBatch::default();
        let mut seeded = 0;
        for item in catalog {
            put_json(&mut batch, cf(&db, CF_ITEMS)?, item.id.0.to_be_bytes(), &item)?;
            seeded += 1;
        }
        db.write(batch)?;
        info!(path = %path.as_ref().display(), items = seeded, "ledger database opened");

        Ok(Self {
            db: Arc::new(db),
            rows: Arc::new(RowLocks::new()),
            gate: Arc::new(RwLock::new(())),
        })
    }

    fn write_unit(&self) -> RocksWriteUnit {
        RocksWriteUnit {
            db: Arc::clone(&self.db),
            rows: Arc::clone(&self.rows),
            gate: Arc::clone(&self.gate),
            held: HeldLocks::new(),
            balances: BTreeMap::new(),
            inventory: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }
}

fn cf<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| LedgerError::internal(format!("{name} column family not found")))
}

fn get_json<T: DeserializeOwned>(db: &DB, family: &str, key: impl AsRef<[u8]>) -> Result<Option<T>> {
    match db.get_cf(cf(db, family)?, key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(
    batch: &mut WriteBatch,
    family: &ColumnFamily,
    key: impl AsRef<[u8]>,
    value: &T,
) -> Result<()> {
    batch.put_cf(family, key, serde_json::to_vec(value)?);
    Ok(())
}

fn read_sequence(db: &DB, key: &[u8]) -> Result<u64> {
    match db.get_cf(cf(db, CF_META)?, key)? {
        Some(bytes) => {
            let raw: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| LedgerError::internal("corrupt sequence value"))?;
            Ok(u64::from_be_bytes(raw))
        }
        None => Ok(1),
    }
}

fn pair_key(first: u64, second: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&first.to_be_bytes());
    key[8..].copy_from_slice(&second.to_be_bytes());
    key
}

/// Returns the second half of every `(user, x)` key under `user`'s prefix.
fn scan_user_prefix(db: &DB, family: &str, user: UserId) -> Result<Vec<(u64, Box<[u8]>)>> {
    let prefix = user.0.to_be_bytes();
    let mut found = Vec::new();
    let iter = db.iterator_cf(
        cf(db, family)?,
        IteratorMode::From(&prefix, Direction::Forward),
    );
    for entry in iter {
        let (key, value) = entry?;
        if !key.starts_with(&prefix) {
            break;
        }
        let suffix: [u8; 8] = key[8..]
            .try_into()
            .map_err(|_| LedgerError::internal(format!("corrupt key in {family}")))?;
        found.push((u64::from_be_bytes(suffix), value));
    }
    Ok(found)
}

fn load_user(db: &DB, user: UserId) -> Result<Option<User>> {
    get_json(db, CF_USERS, user.0.to_be_bytes())
}

fn username_of(db: &DB, user: UserId) -> Result<String> {
    Ok(load_user(db, user)?.map(|u| u.username).unwrap_or_default())
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let _gate = self.gate.write().await;
        if self
            .db
            .get_cf(cf(&self.db, CF_USERNAMES)?, user.username.as_bytes())?
            .is_some()
        {
            return Err(LedgerError::Conflict(ConflictKind::UsernameExists));
        }

        let id = read_sequence(&self.db, NEXT_USER_ID)?;
        let created = User {
            id: UserId(id),
            username: user.username,
            password_hash: user.password_hash,
            balance: user.balance,
        };

        let mut batch = WriteBatch::default();
        put_json(&mut batch, cf(&self.db, CF_USERS)?, id.to_be_bytes(), &created)?;
        batch.put_cf(
            cf(&self.db, CF_USERNAMES)?,
            created.username.as_bytes(),
            id.to_be_bytes(),
        );
        batch.put_cf(cf(&self.db, CF_META)?, NEXT_USER_ID, (id + 1).to_be_bytes());
        self.db.write(batch)?;
        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        match self
            .db
            .get_cf(cf(&self.db, CF_USERNAMES)?, username.as_bytes())?
        {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::internal("corrupt username index"))?;
                load_user(&self.db, UserId(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf(&self.db, CF_USERS)?, IteratorMode::Start);
        for entry in iter {
            let (_key, value) = entry?;
            users.push(serde_json::from_slice(&value)?);
        }
        Ok(users)
    }
}

#[async_trait]
impl TransferStore for RocksDBStore {
    async fn begin_transfer(&self) -> Result<Box<dyn TransferUnit>> {
        Ok(Box::new(self.write_unit()))
    }
}

#[async_trait]
impl PurchaseStore for RocksDBStore {
    async fn begin_purchase(&self) -> Result<Box<dyn PurchaseUnit>> {
        Ok(Box::new(self.write_unit()))
    }
}

#[async_trait]
impl InfoStore for RocksDBStore {
    async fn begin_snapshot(&self) -> Result<Box<dyn InfoUnit>> {
        let gate = Arc::clone(&self.gate).read_owned().await;
        Ok(Box::new(RocksSnapshot {
            db: Arc::clone(&self.db),
            _gate: gate,
        }))
    }
}

struct RocksWriteUnit {
    db: Arc<DB>,
    rows: Arc<RowLocks>,
    gate: Arc<RwLock<()>>,
    held: HeldLocks,
    balances: BTreeMap<UserId, Coins>,
    inventory: BTreeMap<(UserId, ItemId), u32>,
    transactions: Vec<NewTransaction>,
}

impl RocksWriteUnit {
    fn build_batch(&self) -> Result<WriteBatch> {
        let db = &self.db;
        let mut batch = WriteBatch::default();

        for (user, balance) in &self.balances {
            let mut record = load_user(db, *user)?.ok_or(LedgerError::NotFound(Entity::User))?;
            record.balance = *balance;
            put_json(&mut batch, cf(db, CF_USERS)?, user.0.to_be_bytes(), &record)?;
        }

        for ((user, item), quantity) in &self.inventory {
            let entry = InventoryEntry {
                user: *user,
                item: *item,
                quantity: *quantity,
            };
            put_json(&mut batch, cf(db, CF_INVENTORY)?, pair_key(user.0, item.0), &entry)?;
        }

        if !self.transactions.is_empty() {
            let mut next_id = read_sequence(db, NEXT_TX_ID)?;
            let now = Utc::now();
            for tx in &self.transactions {
                let committed: Transaction = tx.commit_as(next_id, now);
                put_json(&mut batch, cf(db, CF_TRANSACTIONS)?, next_id.to_be_bytes(), &committed)?;
                batch.put_cf(cf(db, CF_SENT)?, pair_key(tx.sender.0, next_id), b"");
                batch.put_cf(cf(db, CF_RECEIVED)?, pair_key(tx.receiver.0, next_id), b"");
                next_id += 1;
            }
            batch.put_cf(cf(db, CF_META)?, NEXT_TX_ID, next_id.to_be_bytes());
        }
        Ok(batch)
    }
}

#[async_trait]
impl UnitOfWork for RocksWriteUnit {
    async fn commit(self: Box<Self>) -> Result<()> {
        let gate = Arc::clone(&self.gate);
        let _gate = gate.write().await;
        let batch = self.build_batch()?;
        self.db.write(batch)?;
        debug!(
            balances = self.balances.len(),
            transactions = self.transactions.len(),
            "rocksdb unit committed"
        );
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        drop(self);
        Ok(())
    }
}

#[async_trait]
impl BalanceRows for RocksWriteUnit {
    async fn lock_balance(&mut self, user: UserId) -> Result<Coins> {
        if load_user(&self.db, user)?.is_none() {
            return Err(LedgerError::NotFound(Entity::User));
        }
        self.held.lock(&self.rows, user).await?;
        if let Some(pending) = self.balances.get(&user) {
            return Ok(*pending);
        }
        load_user(&self.db, user)?
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
impl TransferUnit for RocksWriteUnit {
    async fn find_user_id(&mut self, username: &str) -> Result<Option<UserId>> {
        match self
            .db
            .get_cf(cf(&self.db, CF_USERNAMES)?, username.as_bytes())?
        {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::internal("corrupt username index"))?;
                Ok(Some(UserId(u64::from_be_bytes(raw))))
            }
            None => Ok(None),
        }
    }

    async fn append_transaction(&mut self, tx: NewTransaction) -> Result<()> {
        self.transactions.push(tx);
        Ok(())
    }
}

#[async_trait]
impl PurchaseUnit for RocksWriteUnit {
    async fn item(&mut self, item: ItemId) -> Result<Option<Item>> {
        get_json(&self.db, CF_ITEMS, item.0.to_be_bytes())
    }

    async fn add_to_inventory(&mut self, user: UserId, item: ItemId) -> Result<u32> {
        self.held.ensure_held(user)?;
        let current = match self.inventory.get(&(user, item)) {
            Some(pending) => *pending,
            None => get_json::<InventoryEntry>(&self.db, CF_INVENTORY, pair_key(user.0, item.0))?
                .map_or(0, |entry| entry.quantity),
        };
        let quantity = current
            .checked_add(1)
            .ok_or_else(|| LedgerError::internal("inventory quantity overflow"))?;
        self.inventory.insert((user, item), quantity);
        Ok(quantity)
    }
}

struct RocksSnapshot {
    db: Arc<DB>,
    _gate: OwnedRwLockReadGuard<()>,
}

impl RocksSnapshot {
    fn transfers(&self, index: &str, user: UserId) -> Result<Vec<Transaction>> {
        scan_user_prefix(&self.db, index, user)?
            .into_iter()
            .map(|(tx_id, _)| {
                get_json(&self.db, CF_TRANSACTIONS, tx_id.to_be_bytes())?.ok_or_else(|| {
                    LedgerError::internal(format!("transaction {tx_id} missing from log"))
                })
            })
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for RocksSnapshot {
    async fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl InfoUnit for RocksSnapshot {
    async fn balance(&mut self, user: UserId) -> Result<Option<Coins>> {
        Ok(load_user(&self.db, user)?.map(|u| u.balance))
    }

    async fn inventory(&mut self, user: UserId) -> Result<Vec<InventoryItem>> {
        let mut items = Vec::new();
        for (_item_id, value) in scan_user_prefix(&self.db, CF_INVENTORY, user)? {
            let entry: InventoryEntry = serde_json::from_slice(&value)?;
            if let Some(item) = get_json::<Item>(&self.db, CF_ITEMS, entry.item.0.to_be_bytes())? {
                items.push(InventoryItem {
                    item_type: item.name,
                    quantity: entry.quantity,
                });
            }
        }
        Ok(items)
    }

    async fn received(&mut self, user: UserId) -> Result<Vec<ReceivedTransfer>> {
        self.transfers(CF_RECEIVED, user)?
            .into_iter()
            .map(|tx| {
                Ok(ReceivedTransfer {
                    from_user: username_of(&self.db, tx.sender)?,
                    amount: tx.amount.value(),
                })
            })
            .collect()
    }

    async fn sent(&mut self, user: UserId) -> Result<Vec<SentTransfer>> {
        self.transfers(CF_SENT, user)?
            .into_iter()
            .map(|tx| {
                Ok(SentTransfer {
                    to_user: username_of(&self.db, tx.receiver)?,
                    amount: tx.amount.value(),
                })
            })
            .collect()
    }
}
