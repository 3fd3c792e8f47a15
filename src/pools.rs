use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

/// A constant-product liquidity pool between two token symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub token_a: String,
    pub token_b: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub reserve_a: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub reserve_b: Decimal,
}

impl Pool {
    pub fn new(token_a: &str, token_b: &str, reserve_a: Decimal, reserve_b: Decimal) -> Self {
        Pool {
            token_a: token_a.to_string(),
            token_b: token_b.to_string(),
            reserve_a,
            reserve_b,
        }
    }

    /// The pool invariant `k = reserve_a * reserve_b`; `None` when the
    /// product does not fit in a `Decimal`.
    pub fn k(&self) -> Option<Decimal> {
        self.reserve_a.checked_mul(self.reserve_b)
    }

    fn matches(&self, token_in: &str, token_out: &str) -> bool {
        (self.token_a.eq_ignore_ascii_case(token_in) && self.token_b.eq_ignore_ascii_case(token_out))
            || (self.token_a.eq_ignore_ascii_case(token_out)
                && self.token_b.eq_ignore_ascii_case(token_in))
    }
}

/// A pool located for a specific trade direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolView {
    pub index: usize,
    /// `token_in` sits on the `token_a` side of the pool.
    pub token_in_is_a: bool,
    pub reserve_in: Decimal,
    pub reserve_out: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
}

impl PoolRegistry {
    pub fn new(pools: Vec<Pool>) -> Result<Self> {
        for pool in &pools {
            if pool.reserve_a <= Decimal::ZERO || pool.reserve_b <= Decimal::ZERO {
                return Err(WalletError::ConfigError(format!(
                    "Pool {}/{} must have positive reserves",
                    pool.token_a, pool.token_b
                )));
            }
            if pool.token_a.eq_ignore_ascii_case(&pool.token_b) {
                return Err(WalletError::ConfigError(format!(
                    "Pool {}/{} pairs a token with itself",
                    pool.token_a, pool.token_b
                )));
            }
        }
        Ok(PoolRegistry { pools })
    }

    /// Finds the first pool for the unordered pair and orients its reserves
    /// to the requested direction.
    pub fn find_pool(&self, token_in: &str, token_out: &str) -> Result<PoolView> {
        let (index, pool) = self
            .pools
            .iter()
            .enumerate()
            .find(|(_, p)| p.matches(token_in, token_out))
            .ok_or_else(|| WalletError::NoLiquidityPool {
                token_in: token_in.to_string(),
                token_out: token_out.to_string(),
            })?;

        let token_in_is_a = pool.token_a.eq_ignore_ascii_case(token_in);
        let (reserve_in, reserve_out) = if token_in_is_a {
            (pool.reserve_a, pool.reserve_b)
        } else {
            (pool.reserve_b, pool.reserve_a)
        };

        Ok(PoolView {
            index,
            token_in_is_a,
            reserve_in,
            reserve_out,
        })
    }

    /// Writes post-trade reserves given in request orientation.
    pub(crate) fn set_reserves(&mut self, view: &PoolView, reserve_in: Decimal, reserve_out: Decimal) {
        let pool = &mut self.pools[view.index];
        if view.token_in_is_a {
            pool.reserve_a = reserve_in;
            pool.reserve_b = reserve_out;
        } else {
            pool.reserve_b = reserve_in;
            pool.reserve_a = reserve_out;
        }
    }

    pub fn get(&self, index: usize) -> Option<&Pool> {
        self.pools.get(index)
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PoolRegistry {
        PoolRegistry::new(vec![
            Pool::new("ETH", "USDC", Decimal::from(1000), Decimal::from(2_400_000)),
            Pool::new("USDC", "USDT", Decimal::from(500_000), Decimal::from(500_000)),
        ])
        .unwrap()
    }

    #[test]
    fn test_find_pool_forward() {
        let view = registry().find_pool("ETH", "USDC").unwrap();
        assert_eq!(view.index, 0);
        assert!(view.token_in_is_a);
        assert_eq!(view.reserve_in, Decimal::from(1000));
        assert_eq!(view.reserve_out, Decimal::from(2_400_000));
    }

    #[test]
    fn test_find_pool_reversed() {
        let view = registry().find_pool("USDC", "ETH").unwrap();
        assert_eq!(view.index, 0);
        assert!(!view.token_in_is_a);
        assert_eq!(view.reserve_in, Decimal::from(2_400_000));
        assert_eq!(view.reserve_out, Decimal::from(1000));
    }

    #[test]
    fn test_find_pool_missing() {
        let err = registry().find_pool("UNI", "USDT").unwrap_err();
        assert_eq!(err.code(), "NoLiquidityPool");
    }

    #[test]
    fn test_set_reserves_reversed_orientation() {
        let mut registry = registry();
        let view = registry.find_pool("USDC", "ETH").unwrap();
        registry.set_reserves(&view, Decimal::from(2_402_400), Decimal::from(999));
        let pool = registry.get(0).unwrap();
        assert_eq!(pool.reserve_a, Decimal::from(999));
        assert_eq!(pool.reserve_b, Decimal::from(2_402_400));
    }

    #[test]
    fn test_non_positive_reserve_rejected() {
        let result = PoolRegistry::new(vec![Pool::new("A", "B", Decimal::ZERO, Decimal::ONE)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_self_pair_rejected() {
        let result = PoolRegistry::new(vec![Pool::new("A", "a", Decimal::ONE, Decimal::ONE)]);
        assert!(matches!(result, Err(WalletError::ConfigError(_))));
    }

    #[test]
    fn test_k_of_seeded_pool() {
        let binding = registry();
        let pool = &binding.pools()[1];
        assert_eq!(pool.k(), Some(Decimal::from(250_000_000_000u64)));
    }

    #[test]
    fn test_k_overflow_is_none() {
        let huge = Decimal::from(1_000_000_000_000_000u64);
        assert_eq!(Pool::new("A", "B", huge, huge).k(), None);
    }

    #[test]
    fn test_pool_serializes_camel_case() {
        let json = serde_json::to_value(&registry().pools()[1]).unwrap();
        assert_eq!(json["tokenA"], "USDC");
        assert_eq!(json["reserveB"], serde_json::json!(500000.0));
    }
}
