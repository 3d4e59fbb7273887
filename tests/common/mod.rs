#![allow(dead_code)]

use merch_ledger::application::ledger::Ledger;
use merch_ledger::config::LedgerConfig;
use merch_ledger::domain::account::UserId;
use merch_ledger::domain::item::Item;
use merch_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Builds an in-memory ledger and registers `usernames` in order.
pub async fn ledger_with_users(
    catalog: Vec<Item>,
    config: LedgerConfig,
    usernames: &[&str],
) -> (Ledger, InMemoryLedgerStore, Vec<UserId>) {
    let store = InMemoryLedgerStore::with_catalog(catalog);
    let ledger = Ledger::new(Arc::new(store.clone()), config);
    let mut ids = Vec::new();
    for name in usernames {
        let user = ledger.register(name, "hash").await.expect("registration failed");
        ids.push(user.id);
    }
    (ledger, store, ids)
}

pub async fn balance(ledger: &Ledger, user: UserId) -> u64 {
    ledger.user_info(user).await.expect("info failed").coins
}

/// Writes a commands CSV with the standard header followed by `rows`.
pub fn commands_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, user, target, amount").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}
