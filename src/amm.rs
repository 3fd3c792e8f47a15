//! Constant-product (x * y = k) pricing.
//!
//! Pure functions over reserves; the wallet applies the results.

use rust_decimal::Decimal;

use crate::error::{Result, WalletError};
use crate::precision;

/// Swap fee taken from the input side: 0.3%.
pub const FEE_RATE: Decimal = Decimal::from_parts(3, 0, 0, false, 3);

/// Slippage tolerance used when a caller omits one: 0.5%.
pub const DEFAULT_SLIPPAGE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Pricing of a single trade against a pair of reserves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmmQuote {
    pub amount_in: Decimal,
    pub amount_in_with_fee: Decimal,
    /// Fee paid in units of the input token.
    pub fee: Decimal,
    pub amount_out: Decimal,
    pub minimum_amount_out: Decimal,
    /// `amount_in / reserve_in` as a percentage of the pre-trade reserve.
    pub price_impact: Decimal,
}

pub fn validate_slippage(slippage: Decimal) -> Result<()> {
    if slippage < Decimal::ZERO || slippage > Decimal::ONE {
        return Err(WalletError::InvalidSlippage(slippage.to_string()));
    }
    Ok(())
}

fn overflow(step: &str) -> WalletError {
    WalletError::PrecisionError(format!("Overflow computing {}", step))
}

/// `amount_in * (1 - fee) * reserve_out / (reserve_in + amount_in * (1 - fee))`
pub fn get_amount_out(amount_in: Decimal, reserve_in: Decimal, reserve_out: Decimal) -> Result<Decimal> {
    if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount("pool reserves must be positive".to_string()));
    }

    let amount_in_with_fee = amount_in
        .checked_mul(Decimal::ONE - FEE_RATE)
        .ok_or_else(|| overflow("amount in with fee"))?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or_else(|| overflow("numerator"))?;
    let denominator = reserve_in
        .checked_add(amount_in_with_fee)
        .ok_or_else(|| overflow("denominator"))?;

    numerator
        .checked_div(denominator)
        .ok_or_else(|| overflow("amount out"))
}

/// Prices a trade of `amount_in` with the given slippage tolerance.
pub fn quote(
    amount_in: Decimal,
    reserve_in: Decimal,
    reserve_out: Decimal,
    slippage: Decimal,
) -> Result<AmmQuote> {
    if amount_in <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount_in
        )));
    }
    validate_slippage(slippage)?;

    let amount_out = get_amount_out(amount_in, reserve_in, reserve_out)?;
    let fee = amount_in.checked_mul(FEE_RATE).ok_or_else(|| overflow("fee"))?;
    let minimum_amount_out = precision::calculate_min_output_with_slippage(amount_out, slippage)?;
    let price_impact = precision::percentage(amount_in, reserve_in)?;

    Ok(AmmQuote {
        amount_in,
        amount_in_with_fee: amount_in - fee,
        fee,
        amount_out,
        minimum_amount_out,
        price_impact,
    })
}
