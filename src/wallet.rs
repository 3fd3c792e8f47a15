//! In-memory wallet: the balance ledger and pool registry mutated together.
//!
//! Every operation validates and computes all new values before writing any
//! of them, so a failing swap or send leaves the state untouched.

use alloy_primitives::{keccak256, B256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::amm::{self, AmmQuote};
use crate::error::{Result, WalletError};
use crate::ledger::{self, BalanceLedger, Token};
use crate::pools::{Pool, PoolRegistry, PoolView};
use crate::seed::WalletSeed;

/// Shortest recipient identifier accepted by `send`.
pub const MIN_RECIPIENT_LEN: usize = 10;

pub fn validate_recipient(recipient: &str) -> Result<()> {
    if recipient.trim().chars().count() < MIN_RECIPIENT_LEN {
        return Err(WalletError::InvalidRecipient(recipient.to_string()));
    }
    Ok(())
}

/// A priced swap that has not been applied yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuote {
    pub token_in: String,
    pub token_out: String,
    pub slippage: Decimal,
    pub amm: AmmQuote,
    pub reserve_in: Decimal,
    pub reserve_out: Decimal,
    in_index: usize,
    out_index: usize,
    pool: PoolView,
    new_balance_in: Decimal,
    new_balance_out: Decimal,
    new_reserve_in: Decimal,
    new_reserve_out: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapReceipt {
    pub token_in: String,
    pub token_out: String,
    pub slippage: Decimal,
    pub amm: AmmQuote,
    pub new_balance_in: Decimal,
    pub new_balance_out: Decimal,
    pub tx_hash: B256,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub token: String,
    pub amount: Decimal,
    pub recipient: String,
    pub remaining_balance: Decimal,
    pub tx_hash: B256,
    pub timestamp: DateTime<Utc>,
}

fn overflow(what: &str) -> WalletError {
    WalletError::PrecisionError(format!("Overflow updating {}", what))
}

/// One lock around the whole wallet serializes every mutation.
pub type SharedWallet = Arc<Mutex<WalletState>>;

#[derive(Debug, Clone)]
pub struct WalletState {
    ledger: BalanceLedger,
    pools: PoolRegistry,
    nonce: u64,
}

impl WalletState {
    pub fn new(seed: WalletSeed) -> Result<Self> {
        Ok(WalletState {
            ledger: BalanceLedger::new(seed.tokens)?,
            pools: PoolRegistry::new(seed.pools)?,
            nonce: 0,
        })
    }

    /// Prices a swap against current reserves without touching any state.
    pub fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        slippage: Decimal,
    ) -> Result<SwapQuote> {
        ledger::validate_amount(amount_in)?;
        amm::validate_slippage(slippage)?;

        let in_index = self.ledger.index_of(token_in)?;
        let out_index = self.ledger.index_of(token_out)?;
        if in_index == out_index {
            return Err(WalletError::InvalidTokenPair(format!(
                "Cannot swap {} to itself",
                token_in
            )));
        }

        let tokens = self.ledger.tokens();
        let (token_in, token_out) = (&tokens[in_index], &tokens[out_index]);
        self.ledger.ensure_available(&token_in.symbol, amount_in)?;

        let pool = self.pools.find_pool(&token_in.symbol, &token_out.symbol)?;
        let amm = amm::quote(amount_in, pool.reserve_in, pool.reserve_out, slippage)?;

        let new_balance_in = token_in
            .balance
            .checked_sub(amount_in)
            .ok_or_else(|| overflow("input balance"))?;
        let new_balance_out = token_out
            .balance
            .checked_add(amm.amount_out)
            .ok_or_else(|| overflow("output balance"))?;
        let new_reserve_in = pool
            .reserve_in
            .checked_add(amount_in)
            .ok_or_else(|| overflow("input reserve"))?;
        let new_reserve_out = pool
            .reserve_out
            .checked_sub(amm.amount_out)
            .ok_or_else(|| overflow("output reserve"))?;

        Ok(SwapQuote {
            token_in: token_in.symbol.clone(),
            token_out: token_out.symbol.clone(),
            slippage,
            amm,
            reserve_in: pool.reserve_in,
            reserve_out: pool.reserve_out,
            in_index,
            out_index,
            pool,
            new_balance_in,
            new_balance_out,
            new_reserve_in,
            new_reserve_out,
        })
    }

    /// Prices and applies a swap in one step.
    ///
    /// Nothing can move the reserves between quote and commit here, so the
    /// slippage floor is reported but cannot be violated.
    pub fn swap(
        &mut self,
        token_in: &str,
        token_out: &str,
        amount_in: Decimal,
        slippage: Decimal,
    ) -> Result<SwapReceipt> {
        let quote = self.quote(token_in, token_out, amount_in, slippage)?;
        Ok(self.commit_swap(quote))
    }

    /// Applies a quote taken earlier, re-pricing against current reserves.
    ///
    /// Fails with `SlippageExceeded` if the re-priced output falls below the
    /// quote's minimum.
    pub fn execute_quote(&mut self, quoted: &SwapQuote) -> Result<SwapReceipt> {
        let fresh = self.quote(
            &quoted.token_in,
            &quoted.token_out,
            quoted.amm.amount_in,
            quoted.slippage,
        )?;

        if fresh.amm.amount_out < quoted.amm.minimum_amount_out {
            return Err(WalletError::SlippageExceeded {
                minimum: quoted.amm.minimum_amount_out.normalize().to_string(),
                actual: fresh.amm.amount_out.normalize().to_string(),
            });
        }

        Ok(self.commit_swap(fresh))
    }

    fn commit_swap(&mut self, quote: SwapQuote) -> SwapReceipt {
        self.ledger.set_balance(quote.in_index, quote.new_balance_in);
        self.ledger.set_balance(quote.out_index, quote.new_balance_out);
        self.pools
            .set_reserves(&quote.pool, quote.new_reserve_in, quote.new_reserve_out);

        let timestamp = Utc::now();
        let tx_hash = self.next_tx_hash(
            &format!(
                "swap:{}:{}:{}",
                quote.token_in, quote.token_out, quote.amm.amount_in
            ),
            timestamp,
        );

        info!(
            "Swapped {} {} -> {} {} (tx {})",
            quote.amm.amount_in, quote.token_in, quote.amm.amount_out, quote.token_out, tx_hash
        );

        SwapReceipt {
            token_in: quote.token_in,
            token_out: quote.token_out,
            slippage: quote.slippage,
            amm: quote.amm,
            new_balance_in: quote.new_balance_in,
            new_balance_out: quote.new_balance_out,
            tx_hash,
            timestamp,
        }
    }

    /// Debits `amount` of `token` towards `recipient`.
    pub fn send(&mut self, token: &str, amount: Decimal, recipient: &str) -> Result<SendReceipt> {
        ledger::validate_amount(amount)?;
        let index = self.ledger.index_of(token)?;
        let symbol = self.ledger.tokens()[index].symbol.clone();
        self.ledger.ensure_available(&symbol, amount)?;
        validate_recipient(recipient)?;

        let remaining_balance = self.ledger.tokens()[index]
            .balance
            .checked_sub(amount)
            .ok_or_else(|| overflow("balance"))?;
        self.ledger.set_balance(index, remaining_balance);

        let timestamp = Utc::now();
        let tx_hash =
            self.next_tx_hash(&format!("send:{}:{}:{}", symbol, amount, recipient), timestamp);

        info!("Sent {} {} to {} (tx {})", amount, symbol, recipient, tx_hash);

        Ok(SendReceipt {
            token: symbol,
            amount,
            recipient: recipient.to_string(),
            remaining_balance,
            tx_hash,
            timestamp,
        })
    }

    fn next_tx_hash(&mut self, payload: &str, timestamp: DateTime<Utc>) -> B256 {
        self.nonce += 1;
        let preimage = format!("{}:{}:{}", payload, self.nonce, timestamp.to_rfc3339());
        debug!("Hashing transaction preimage: {}", preimage);
        keccak256(preimage.as_bytes())
    }

    pub fn into_shared(self) -> SharedWallet {
        Arc::new(Mutex::new(self))
    }

    pub fn tokens(&self) -> &[Token] {
        self.ledger.tokens()
    }

    pub fn pools(&self) -> &[Pool] {
        self.pools.pools()
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.pools
    }
}
