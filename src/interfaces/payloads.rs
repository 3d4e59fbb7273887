//! Request and response bodies exchanged with clients. The JSON field names
//! are fixed for compatibility.

use crate::domain::info::PurchaseReceipt;
use crate::error::{ErrorKind, LedgerError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct SendCoinRequest {
    #[serde(rename = "toUser")]
    pub to_user: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn coins_sent() -> Self {
        Self {
            message: "Coins sent successfully".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct PurchaseResponse {
    pub message: String,
    pub item: String,
    pub coins: u64,
    pub quantity: u32,
}

impl From<PurchaseReceipt> for PurchaseResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            message: "Item purchased successfully!".to_string(),
            item: receipt.item,
            coins: receipt.balance,
            quantity: receipt.quantity,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct ErrorResponse {
    pub errors: String,
}

impl From<&LedgerError> for ErrorResponse {
    /// Internal failures are reported generically; every other kind carries
    /// its message.
    fn from(err: &LedgerError) -> Self {
        let errors = match err.kind() {
            ErrorKind::Internal => "Internal error".to_string(),
            ErrorKind::Transient => "Temporarily unavailable, retry later".to_string(),
            _ => err.to_string(),
        };
        Self { errors }
    }
}
