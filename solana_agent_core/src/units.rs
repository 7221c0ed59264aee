//! Conversions between UI amounts and on-chain base units.

use std::str::FromStr;

use anyhow::{anyhow, ensure, Context, Result};
use bigdecimal::{BigDecimal, ToPrimitive};
use solana_sdk::native_token::LAMPORTS_PER_SOL;

pub const SOL_DECIMALS: u8 = 9;

/// Convert a UI amount into integer base units. Goes through a decimal
/// string so `0.1` SOL is exactly `100_000_000` lamports; dust below one
/// base unit is truncated.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64> {
    ensure!(amount.is_finite(), "amount must be a finite number");
    ensure!(decimals <= 18, "unsupported decimals: {decimals}");
    let amount = BigDecimal::from_str(&amount.to_string()).context("amount is not a decimal number")?;
    let scaled = (amount * BigDecimal::from(10u64.pow(decimals as u32))).with_scale(0);
    scaled
        .to_u64()
        .ok_or_else(|| anyhow!("amount does not fit in {decimals}-decimal base units"))
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
