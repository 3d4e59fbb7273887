use serde::{Deserialize, Serialize};

/// A consistent snapshot of one user's balance, inventory and transfer history.
///
/// Field names match the JSON shape served to clients.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct UserInfo {
    pub coins: u64,
    pub inventory: Vec<InventoryItem>,
    #[serde(rename = "coinHistory")]
    pub coin_history: CoinHistory,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct InventoryItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct CoinHistory {
    pub received: Vec<ReceivedTransfer>,
    pub sent: Vec<SentTransfer>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ReceivedTransfer {
    #[serde(rename = "fromUser")]
    pub from_user: String,
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct SentTransfer {
    #[serde(rename = "toUser")]
    pub to_user: String,
    pub amount: u64,
}

/// Result of a successful purchase.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PurchaseReceipt {
    pub item_id: u64,
    pub item: String,
    pub price: u64,
    pub balance: u64,
    pub quantity: u32,
}
