use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::Token;
use crate::pools::Pool;
use crate::wallet::SharedWallet;

/// `getBalances` takes no arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalancesRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub success: bool,
    pub balances: Vec<Token>,
    pub total_tokens: usize,
    pub timestamp: String,
}

/// Read-only views of the wallet.
pub struct BalanceTool {
    wallet: SharedWallet,
}

impl BalanceTool {
    pub fn new(wallet: SharedWallet) -> Self {
        BalanceTool { wallet }
    }

    pub async fn get_balances(&self, _request: BalancesRequest) -> BalancesResponse {
        let balances = self.tokens().await;
        debug!("Reporting {} balances", balances.len());

        BalancesResponse {
            success: true,
            total_tokens: balances.len(),
            balances,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub async fn tokens(&self) -> Vec<Token> {
        self.wallet.lock().await.tokens().to_vec()
    }

    pub async fn pools(&self) -> Vec<Pool> {
        self.wallet.lock().await.pools().to_vec()
    }
}
