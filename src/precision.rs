use alloy::primitives::U256;
use rust_decimal::prelude::*;

use crate::error::{Result, WalletError};

/// Decimal places kept when amounts leave the wallet for display.
pub const DISPLAY_DECIMALS: u32 = 6;

/// Rounds an amount for presentation only.
///
/// Ledger and pool state always keep full precision; rounding happens once,
/// when a response is serialized, so repeated swaps never compound error.
pub fn round_display(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Converts a raw on-chain amount (smallest unit) into a human readable decimal.
///
/// # Example
/// ```ignore
/// let raw = U256::from(1_000_000_000_000_000_000u64);
/// let decimal = to_decimal(raw, 18)?; // Decimal::from(1)
/// ```
pub fn to_decimal(raw_amount: U256, decimals: u8) -> Result<Decimal> {
    let mut divisor = Decimal::ONE;
    for _ in 0..decimals {
        divisor = divisor
            .checked_mul(Decimal::TEN)
            .ok_or_else(|| WalletError::PrecisionError("Too many decimals".to_string()))?;
    }

    let amount_decimal = Decimal::from_str(&raw_amount.to_string())
        .map_err(|e| WalletError::PrecisionError(format!("Failed to parse amount: {}", e)))?;

    amount_decimal
        .checked_div(divisor)
        .ok_or_else(|| WalletError::PrecisionError("Division overflow".to_string()))
}

/// Applies a slippage tolerance to an expected output.
///
/// `slippage` is a fraction: 0.005 means 0.5%.
pub fn calculate_min_output_with_slippage(
    expected_output: Decimal,
    slippage: Decimal,
) -> Result<Decimal> {
    if slippage < Decimal::ZERO || slippage > Decimal::ONE {
        return Err(WalletError::InvalidSlippage(slippage.to_string()));
    }

    expected_output
        .checked_mul(Decimal::ONE - slippage)
        .ok_or_else(|| WalletError::PrecisionError("Multiplication overflow".to_string()))
}

/// `part / whole` expressed as a percentage.
pub fn percentage(part: Decimal, whole: Decimal) -> Result<Decimal> {
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| WalletError::PrecisionError("Percentage overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_display_six_places() {
        let value = Decimal::from_str("995.0159382191909332790415911").unwrap();
        assert_eq!(round_display(value), Decimal::from_str("995.015938").unwrap());
    }

    #[test]
    fn test_round_display_drops_trailing_zeros() {
        let value = Decimal::from_str("50.000000").unwrap();
        assert_eq!(round_display(value).to_string(), "50");
    }

    #[test]
    fn test_to_decimal_native() {
        let raw = U256::from(1_500_000_000_000_000_000u64);
        let result = to_decimal(raw, 18).unwrap();
        assert_eq!(result, Decimal::from_str("1.5").unwrap());
    }

    #[test]
    fn test_slippage_calculation() {
        let expected = Decimal::from(1000);
        let slippage = Decimal::from_str("0.005").unwrap();
        let min_output = calculate_min_output_with_slippage(expected, slippage).unwrap();
        assert_eq!(min_output, Decimal::from(995));
    }

    #[test]
    fn test_slippage_out_of_range() {
        let result = calculate_min_output_with_slippage(Decimal::from(1), Decimal::from(2));
        assert!(matches!(result, Err(WalletError::InvalidSlippage(_))));
    }

    #[test]
    fn test_percentage() {
        let pct = percentage(Decimal::from(1000), Decimal::from(500000)).unwrap();
        assert_eq!(pct, Decimal::from_str("0.2").unwrap());
    }
}
