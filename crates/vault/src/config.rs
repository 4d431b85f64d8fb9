//! Owner-mutable vault configuration.
//!
//! A single aggregate mutated only through the vault's gated setters;
//! every mutation of the range width immediately recomputes the derived
//! desired bounds, so `desired_range` always reflects the latest policy
//! intent even before it is materialized on-venue.

use range_vault_domain::types::{FEE_DENOMINATOR, TickRange};
use range_vault_domain::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};

/// Configuration for one vault instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Account allowed to call the gated setters.
    pub owner: String,
    /// Address of token0 (the base asset).
    pub token0: String,
    /// Address of token1 (the quote asset).
    pub token1: String,
    /// Protocol fee numerator over [`FEE_DENOMINATOR`].
    pub protocol_fee_num: u128,
    /// Slippage tolerance numerator over [`FEE_DENOMINATOR`].
    pub slippage_num: u128,
    /// Configured width of the target range, in ticks.
    pub desired_tick_range: i32,
    /// Target bounds, centered on the tick-rounded price at last
    /// recompute.
    pub desired_range: TickRange,
}

/// Rejects a fee or slippage numerator above the shared denominator.
pub fn ensure_fraction(numerator: u128) -> VaultResult<()> {
    if numerator > FEE_DENOMINATOR {
        return Err(VaultError::InvalidInput(
            "numerator exceeds fee denominator",
        ));
    }
    Ok(())
}
