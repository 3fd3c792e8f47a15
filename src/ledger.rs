use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

/// A wallet token and the user's balance of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub name: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub balance: Decimal,
}

impl Token {
    pub fn new(symbol: &str, name: &str, balance: Decimal) -> Self {
        Token {
            symbol: symbol.to_string(),
            name: name.to_string(),
            balance,
        }
    }
}

/// Rejects zero and negative amounts.
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Per-symbol balances, kept in seed order.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceLedger {
    tokens: Vec<Token>,
}

impl BalanceLedger {
    pub fn new(tokens: Vec<Token>) -> Result<Self> {
        for (i, token) in tokens.iter().enumerate() {
            if token.balance < Decimal::ZERO {
                return Err(WalletError::ConfigError(format!(
                    "Token {} has a negative balance",
                    token.symbol
                )));
            }
            if tokens[..i]
                .iter()
                .any(|t| t.symbol.eq_ignore_ascii_case(&token.symbol))
            {
                return Err(WalletError::ConfigError(format!(
                    "Duplicate token symbol: {}",
                    token.symbol
                )));
            }
        }
        Ok(BalanceLedger { tokens })
    }

    /// Position of a token, matching the symbol case-insensitively.
    pub fn index_of(&self, symbol: &str) -> Result<usize> {
        self.tokens
            .iter()
            .position(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| WalletError::TokenNotFound(symbol.to_string()))
    }

    pub fn get(&self, symbol: &str) -> Result<&Token> {
        self.index_of(symbol).map(|i| &self.tokens[i])
    }

    pub fn balance_of(&self, symbol: &str) -> Result<Decimal> {
        self.get(symbol).map(|t| t.balance)
    }

    /// Fails with `InsufficientBalance` unless `amount` can be debited.
    pub fn ensure_available(&self, symbol: &str, amount: Decimal) -> Result<()> {
        let token = self.get(symbol)?;
        if token.balance < amount {
            return Err(WalletError::InsufficientBalance {
                symbol: token.symbol.clone(),
                required: amount.normalize().to_string(),
                available: token.balance.normalize().to_string(),
            });
        }
        Ok(())
    }

    /// Overwrites the balance at `index`.
    ///
    /// Callers check funds and compute the new value with checked arithmetic
    /// first, so this never fails.
    pub(crate) fn set_balance(&mut self, index: usize, balance: Decimal) {
        self.tokens[index].balance = balance;
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ledger() -> BalanceLedger {
        BalanceLedger::new(vec![
            Token::new("USDC", "USD Coin", Decimal::from(10000)),
            Token::new("LINK", "Chainlink", Decimal::from(100)),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_ignores_case() {
        let ledger = ledger();
        assert_eq!(ledger.balance_of("link").unwrap(), Decimal::from(100));
        assert_eq!(ledger.index_of("USDC").unwrap(), 0);
    }

    #[test]
    fn test_unknown_token() {
        let ledger = ledger();
        assert_eq!(
            ledger.get("DOGE").unwrap_err(),
            WalletError::TokenNotFound("DOGE".to_string())
        );
    }

    #[test]
    fn test_ensure_available() {
        let ledger = ledger();
        assert!(ledger.ensure_available("LINK", Decimal::from(100)).is_ok());
        let err = ledger
            .ensure_available("LINK", Decimal::from_str("100.5").unwrap())
            .unwrap_err();
        assert_eq!(err.code(), "InsufficientBalance");
    }

    #[test]
    fn test_duplicate_symbols_rejected() {
        let result = BalanceLedger::new(vec![
            Token::new("USDC", "USD Coin", Decimal::ONE),
            Token::new("usdc", "Another", Decimal::ONE),
        ]);
        assert!(matches!(result, Err(WalletError::ConfigError(_))));
    }

    #[test]
    fn test_negative_balance_rejected() {
        let result = BalanceLedger::new(vec![Token::new("USDC", "USD Coin", Decimal::NEGATIVE_ONE)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Decimal::ONE).is_ok());
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_token_serializes_balance_as_number() {
        let token = Token::new("CHZ", "Chiliz", Decimal::from_str("5.5").unwrap());
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["balance"], serde_json::json!(5.5));
    }
}
