use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::amm;
use crate::error::Result;
use crate::ledger;
use crate::precision::round_display;
use crate::wallet::{SharedWallet, SwapReceipt};

fn default_slippage() -> Decimal {
    amm::DEFAULT_SLIPPAGE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    /// Fraction, e.g. 0.005 for 0.5%.
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,
}

impl SwapRequest {
    pub fn validate(&self) -> Result<()> {
        ledger::validate_amount(self.amount_in)?;
        amm::validate_slippage(self.slippage)
    }
}

/// Display form of a completed swap; amounts rounded to six places.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    pub success: bool,
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_in: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_out: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub minimum_amount_out: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    /// Percent of the pre-trade input reserve.
    #[serde(with = "rust_decimal::serde::float")]
    pub price_impact: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub exchange_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub slippage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance_in: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance_out: Decimal,
    pub tx_hash: String,
    pub timestamp: String,
}

impl From<SwapReceipt> for SwapResponse {
    fn from(receipt: SwapReceipt) -> Self {
        let exchange_rate = receipt
            .amm
            .amount_out
            .checked_div(receipt.amm.amount_in)
            .unwrap_or(Decimal::ZERO);

        SwapResponse {
            success: true,
            token_in: receipt.token_in,
            token_out: receipt.token_out,
            amount_in: receipt.amm.amount_in.normalize(),
            amount_out: round_display(receipt.amm.amount_out),
            minimum_amount_out: round_display(receipt.amm.minimum_amount_out),
            fee: round_display(receipt.amm.fee),
            price_impact: round_display(receipt.amm.price_impact),
            exchange_rate: round_display(exchange_rate),
            slippage: receipt.slippage.normalize(),
            new_balance_in: round_display(receipt.new_balance_in),
            new_balance_out: round_display(receipt.new_balance_out),
            tx_hash: receipt.tx_hash.to_string(),
            timestamp: receipt.timestamp.to_rfc3339(),
        }
    }
}

pub struct SwapTool {
    wallet: SharedWallet,
}

impl SwapTool {
    pub fn new(wallet: SharedWallet) -> Self {
        SwapTool { wallet }
    }

    /// Executes a swap against the in-memory pools.
    pub async fn swap(&self, request: SwapRequest) -> Result<SwapResponse> {
        info!(
            "Swap: {} {} -> {} (slippage {})",
            request.amount_in, request.token_in, request.token_out, request.slippage
        );

        let mut wallet = self.wallet.lock().await;
        let receipt = wallet
            .swap(
                &request.token_in,
                &request.token_out,
                request.amount_in,
                request.slippage,
            )
            .map_err(|e| {
                warn!("Swap rejected: {}", e);
                e
            })?;

        Ok(receipt.into())
    }
}
