use super::account::{Coins, UserId};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a catalog item. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl TryFrom<i64> for ItemId {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value > 0 {
            Ok(Self(value as u64))
        } else {
            Err(LedgerError::ValidationError(format!(
                "Invalid item id: {value}"
            )))
        }
    }
}

impl FromStr for ItemId {
    type Err = LedgerError;

    /// Parses an item id taken from a path parameter.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| LedgerError::ValidationError(format!("Invalid item id: {raw:?}")))?;
        Self::try_from(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A purchasable catalog entry. Reference data, never mutated by the ledger.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub price: Coins,
}

impl Item {
    pub fn new(id: u64, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: ItemId(id),
            name: name.into(),
            price: Coins(price),
        }
    }

    /// The merch store's default catalog.
    pub fn merch_catalog() -> Vec<Item> {
        [
            ("t-shirt", 80),
            ("cup", 20),
            ("book", 50),
            ("pen", 10),
            ("powerbank", 200),
            ("hoody", 300),
            ("umbrella", 200),
            ("socks", 10),
            ("wallet", 50),
            ("pink-hoody", 500),
        ]
        .into_iter()
        .zip(1u64..)
        .map(|((name, price), id)| Item::new(id, name, price))
        .collect()
    }
}

/// How many units of an item a user owns.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct InventoryEntry {
    pub user: UserId,
    pub item: ItemId,
    pub quantity: u32,
}
