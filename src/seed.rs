use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, WalletError};
use crate::ledger::Token;
use crate::pools::Pool;

/// Starting balances and pools for the in-memory wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSeed {
    pub tokens: Vec<Token>,
    pub pools: Vec<Pool>,
}

fn dec(mantissa: i64, scale: u32) -> Decimal {
    Decimal::new(mantissa, scale)
}

impl WalletSeed {
    /// Chiliz testnet demo wallet.
    pub fn builtin() -> Self {
        let tokens = vec![
            Token::new("CHZ", "Chiliz", dec(55, 1)),
            Token::new("USDC", "USD Coin", dec(10_000, 0)),
            Token::new("USDT", "Tether", dec(5_000, 0)),
            Token::new("WBTC", "Wrapped Bitcoin", dec(15, 2)),
            Token::new("UNI", "Uniswap", dec(250, 0)),
            Token::new("LINK", "Chainlink", dec(100, 0)),
            Token::new("ETH", "Ethereum", Decimal::ZERO),
        ];

        let pools = vec![
            Pool::new("ETH", "USDC", dec(1_000, 0), dec(2_400_000, 0)),
            Pool::new("ETH", "USDT", dec(800, 0), dec(1_920_000, 0)),
            Pool::new("WBTC", "ETH", dec(50, 0), dec(1_400, 0)),
            Pool::new("UNI", "ETH", dec(10_000, 0), dec(350, 0)),
            Pool::new("LINK", "ETH", dec(5_000, 0), dec(300, 0)),
            Pool::new("USDC", "USDT", dec(500_000, 0), dec(500_000, 0)),
        ];

        WalletSeed { tokens, pools }
    }

    /// Loads a seed from a JSON file shaped like `{"tokens": [...], "pools": [...]}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WalletError::ConfigError(format!("Cannot read seed file {}: {}", path.display(), e))
        })?;
        let seed: WalletSeed = serde_json::from_str(&raw).map_err(|e| {
            WalletError::ConfigError(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        info!(
            "Loaded wallet seed from {} ({} tokens, {} pools)",
            path.display(),
            seed.tokens.len(),
            seed.pools.len()
        );
        Ok(seed)
    }

    /// The seed file when one is configured, otherwise the built-in seed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }
}

impl Default for WalletSeed {
    fn default() -> Self {
        Self::builtin()
    }
}
