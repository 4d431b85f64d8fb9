//! Position, reserve, and claim valuation plus swap sizing.
//!
//! Every function here is pure over an explicit [`PriceSnapshot`]: one
//! snapshot is captured at the top of each vault operation and threaded
//! through the whole call tree, so a fresh price never interleaves with
//! stale balances inside one computation.

use crate::venue_err;
use primitive_types::U256;
use range_vault_domain::math::fixed_point::{checked_add, mul_div};
use range_vault_domain::math::liquidity::{
    amount0_for_liquidity, amount1_for_liquidity, amounts_for_liquidity,
};
use range_vault_domain::math::tick::{ONE_X64, sqrt_price_at_tick, tick_at_sqrt_price};
use range_vault_domain::types::{Asset, FEE_DENOMINATOR, TickRange};
use range_vault_domain::{VaultError, VaultResult};
use range_vault_venues::PositionVenue;
use std::cmp::Ordering;

/// The instantaneous market state one vault operation computes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSnapshot {
    /// Pool sqrt price, Q64.64.
    pub sqrt_price_x64: u128,
    /// Tick corresponding to the sqrt price.
    pub tick: i32,
}

impl PriceSnapshot {
    /// Reads the venue price once and fixes it for the rest of the call.
    pub async fn capture<P: PositionVenue + ?Sized>(venue: &P) -> VaultResult<Self> {
        let sqrt_price_x64 = venue.current_sqrt_price().await.map_err(venue_err)?;
        let tick = tick_at_sqrt_price(sqrt_price_x64)?;
        Ok(Self {
            sqrt_price_x64,
            tick,
        })
    }
}

/// Zero-slippage, venue-fee-adjusted swap estimate at the snapshot price.
///
/// An estimate of what a swap would return, not a guaranteed outcome.
pub fn estimate_swap_output(
    snapshot: &PriceSnapshot,
    venue_fee: u32,
    token_in: Asset,
    amount_in: u128,
) -> VaultResult<u128> {
    let spot = snapshot.sqrt_price_x64;
    let raw_out = match token_in {
        Asset::Base => mul_div(mul_div(amount_in, spot, ONE_X64)?, spot, ONE_X64)?,
        Asset::Quote => mul_div(mul_div(amount_in, ONE_X64, spot)?, ONE_X64, spot)?,
    };
    mul_div(
        raw_out,
        FEE_DENOMINATOR - u128::from(venue_fee),
        FEE_DENOMINATOR,
    )
}

/// The floor handed to the swap venue: the estimate scaled down by the
/// configured slippage tolerance. Execution reverts below it.
pub fn min_acceptable_output(estimate: u128, slippage_num: u128) -> VaultResult<u128> {
    mul_div(estimate, FEE_DENOMINATOR - slippage_num, FEE_DENOMINATOR)
}

/// Value of the idle reserves in terms of `asset`: the held balance plus
/// the other balance converted at the snapshot price, venue fee deducted.
pub fn reserve_value(
    asset: Asset,
    idle0: u128,
    idle1: u128,
    snapshot: &PriceSnapshot,
    venue_fee: u32,
) -> VaultResult<u128> {
    let (own, other_amount, other) = match asset {
        Asset::Base => (idle0, idle1, Asset::Quote),
        Asset::Quote => (idle1, idle0, Asset::Base),
    };
    let converted = estimate_swap_output(snapshot, venue_fee, other, other_amount)?;
    checked_add(own, converted)
}

/// Token amounts `liquidity` over `range` would yield if fully withdrawn
/// at the snapshot price.
pub fn position_amounts(
    snapshot: &PriceSnapshot,
    range: &TickRange,
    liquidity: u128,
) -> VaultResult<(u128, u128)> {
    let sqrt_lower = sqrt_price_at_tick(range.lower)?;
    let sqrt_upper = sqrt_price_at_tick(range.upper)?;
    amounts_for_liquidity(snapshot.sqrt_price_x64, sqrt_lower, sqrt_upper, liquidity)
}

/// Single-asset value of the position's liquidity, valued against the
/// configured desired bounds rather than the live actual ticks.
pub fn position_value(
    asset: Asset,
    snapshot: &PriceSnapshot,
    desired: &TickRange,
    liquidity: u128,
    venue_fee: u32,
) -> VaultResult<u128> {
    let (amount0, amount1) = position_amounts(snapshot, desired, liquidity)?;
    match asset {
        Asset::Base => checked_add(
            amount0,
            estimate_swap_output(snapshot, venue_fee, Asset::Quote, amount1)?,
        ),
        Asset::Quote => checked_add(
            amount1,
            estimate_swap_output(snapshot, venue_fee, Asset::Base, amount0)?,
        ),
    }
}

fn nonzero_swap(asset: Asset, amount: u128) -> Option<(Asset, u128)> {
    if amount == 0 { None } else { Some((asset, amount)) }
}

fn u256_to_u128(value: U256) -> VaultResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(VaultError::ArithmeticError);
    }
    Ok(value.as_u128())
}

/// Sizes the swap that brings idle reserves to the ratio the desired
/// range requires at the snapshot price.
///
/// Returns the surplus side and the exact input amount, `None` when the
/// reserves already match (or only dust separates them). The solve
/// accounts for the venue fee on the swap leg, so the post-swap balances
/// land on the target ratio instead of overshooting by the fee.
///
/// With the price outside the desired range the position is single-sided
/// and the whole balance of the useless asset is the swap input.
pub fn swap_to_ratio_amount(
    snapshot: &PriceSnapshot,
    desired: &TickRange,
    idle0: u128,
    idle1: u128,
    venue_fee: u32,
) -> VaultResult<Option<(Asset, u128)>> {
    if idle0 == 0 && idle1 == 0 {
        return Ok(None);
    }
    let sqrt_lower = sqrt_price_at_tick(desired.lower)?;
    let sqrt_upper = sqrt_price_at_tick(desired.upper)?;
    let spot = snapshot.sqrt_price_x64;

    if spot <= sqrt_lower {
        // Range sits entirely above the price: only token0 deploys.
        return Ok(nonzero_swap(Asset::Quote, idle1));
    }
    if spot >= sqrt_upper {
        return Ok(nonzero_swap(Asset::Base, idle0));
    }

    // Per-unit requirements of the desired range at this price. The probe
    // liquidity only sets the resolution of the ratio.
    const PROBE_LIQUIDITY: u128 = 1 << 64;
    let need0 = amount0_for_liquidity(PROBE_LIQUIDITY, spot, sqrt_upper)?;
    let need1 = amount1_for_liquidity(PROBE_LIQUIDITY, sqrt_lower, spot)?;
    if need0 == 0 {
        return Ok(nonzero_swap(Asset::Base, idle0));
    }
    if need1 == 0 {
        return Ok(nonzero_swap(Asset::Quote, idle1));
    }

    let have = U256::from(idle0) * U256::from(need1);
    let want = U256::from(idle1) * U256::from(need0);
    let fee_complement = FEE_DENOMINATOR - u128::from(venue_fee);

    match have.cmp(&want) {
        Ordering::Equal => Ok(None),
        Ordering::Greater => {
            // Token0 surplus. Solve (idle0 - dx) * need1 =
            // (idle1 + dx * price * (1 - fee)) * need0 for dx.
            let quoted = mul_div(mul_div(need0, spot, ONE_X64)?, spot, ONE_X64)?;
            let fee_adjusted = mul_div(quoted, fee_complement, FEE_DENOMINATOR)?;
            let denominator = checked_add(need1, fee_adjusted)?;
            let amount = u256_to_u128((have - want) / U256::from(denominator))?;
            Ok(nonzero_swap(Asset::Base, amount.min(idle0)))
        }
        Ordering::Less => {
            let quoted = mul_div(mul_div(need1, ONE_X64, spot)?, ONE_X64, spot)?;
            let fee_adjusted = mul_div(quoted, fee_complement, FEE_DENOMINATOR)?;
            let denominator = checked_add(need0, fee_adjusted)?;
            let amount = u256_to_u128((want - have) / U256::from(denominator))?;
            Ok(nonzero_swap(Asset::Quote, amount.min(idle1)))
        }
    }
}
