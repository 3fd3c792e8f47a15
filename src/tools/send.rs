use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::ledger;
use crate::precision::round_display;
use crate::wallet::{self, SendReceipt, SharedWallet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    pub token: String,
    pub amount: Decimal,
    pub recipient: String,
}

impl SendRequest {
    pub fn validate(&self) -> Result<()> {
        ledger::validate_amount(self.amount)?;
        wallet::validate_recipient(&self.recipient)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub token: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub recipient: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_balance: Decimal,
    pub tx_hash: String,
    pub timestamp: String,
}

impl From<SendReceipt> for SendResponse {
    fn from(receipt: SendReceipt) -> Self {
        SendResponse {
            success: true,
            token: receipt.token,
            amount: receipt.amount.normalize(),
            recipient: receipt.recipient,
            remaining_balance: round_display(receipt.remaining_balance),
            tx_hash: receipt.tx_hash.to_string(),
            timestamp: receipt.timestamp.to_rfc3339(),
        }
    }
}

pub struct SendTool {
    wallet: SharedWallet,
}

impl SendTool {
    pub fn new(wallet: SharedWallet) -> Self {
        SendTool { wallet }
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendResponse> {
        info!(
            "Send: {} {} to {}",
            request.amount, request.token, request.recipient
        );

        let mut wallet = self.wallet.lock().await;
        let receipt = wallet
            .send(&request.token, request.amount, &request.recipient)
            .map_err(|e| {
                warn!("Send rejected: {}", e);
                e
            })?;

        Ok(receipt.into())
    }
}
