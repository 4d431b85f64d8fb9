//! Liquidity <-> token amount conversions over a sqrt price range.
//!
//! All sqrt prices are Q64.64. Results floor; callers that need the
//! conservative-high direction say so explicitly at the call site.

use crate::error::{VaultError, VaultResult};
use crate::math::fixed_point::{mul_div, mul_div_rounding_up};
use crate::math::tick::ONE_X64;

fn sorted(sqrt_a: u128, sqrt_b: u128) -> (u128, u128) {
    if sqrt_a < sqrt_b {
        (sqrt_a, sqrt_b)
    } else {
        (sqrt_b, sqrt_a)
    }
}

/// Amount of token0 backing `liquidity` between two sqrt prices.
///
/// amount0 = L * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b)
pub fn amount0_for_liquidity(liquidity: u128, sqrt_a: u128, sqrt_b: u128) -> VaultResult<u128> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    if lower == 0 {
        return Err(VaultError::ArithmeticError);
    }
    let intermediate = mul_div(liquidity, ONE_X64, lower)?;
    mul_div(intermediate, upper - lower, upper)
}

/// Amount of token1 backing `liquidity` between two sqrt prices.
///
/// amount1 = L * (sqrt_b - sqrt_a)
pub fn amount1_for_liquidity(liquidity: u128, sqrt_a: u128, sqrt_b: u128) -> VaultResult<u128> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    mul_div(liquidity, upper - lower, ONE_X64)
}

/// Liquidity purchasable with `amount0` between two sqrt prices.
///
/// L = amount0 * sqrt_a * sqrt_b / (sqrt_b - sqrt_a)
pub fn liquidity_for_amount0(amount0: u128, sqrt_a: u128, sqrt_b: u128) -> VaultResult<u128> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    if lower == upper {
        return Err(VaultError::ArithmeticError);
    }
    let intermediate = mul_div(amount0, lower, ONE_X64)?;
    mul_div(intermediate, upper, upper - lower)
}

/// Liquidity purchasable with `amount1` between two sqrt prices.
///
/// L = amount1 / (sqrt_b - sqrt_a)
pub fn liquidity_for_amount1(amount1: u128, sqrt_a: u128, sqrt_b: u128) -> VaultResult<u128> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    if lower == upper {
        return Err(VaultError::ArithmeticError);
    }
    mul_div(amount1, ONE_X64, upper - lower)
}

/// [`amount0_for_liquidity`] rounding up: what a depositor owes for the
/// liquidity rather than what a withdrawal yields.
pub fn amount0_for_liquidity_rounding_up(
    liquidity: u128,
    sqrt_a: u128,
    sqrt_b: u128,
) -> VaultResult<u128> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    if lower == 0 {
        return Err(VaultError::ArithmeticError);
    }
    let intermediate = mul_div_rounding_up(liquidity, ONE_X64, lower)?;
    mul_div_rounding_up(intermediate, upper - lower, upper)
}

/// [`amount1_for_liquidity`] rounding up.
pub fn amount1_for_liquidity_rounding_up(
    liquidity: u128,
    sqrt_a: u128,
    sqrt_b: u128,
) -> VaultResult<u128> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    mul_div_rounding_up(liquidity, upper - lower, ONE_X64)
}

/// Token amounts a position of `liquidity` over `[sqrt_a, sqrt_b]` would
/// yield if fully withdrawn at `sqrt_price`.
pub fn amounts_for_liquidity(
    sqrt_price: u128,
    sqrt_a: u128,
    sqrt_b: u128,
    liquidity: u128,
) -> VaultResult<(u128, u128)> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    if sqrt_price <= lower {
        // Below range: all token0.
        Ok((amount0_for_liquidity(liquidity, lower, upper)?, 0))
    } else if sqrt_price < upper {
        let amount0 = amount0_for_liquidity(liquidity, sqrt_price, upper)?;
        let amount1 = amount1_for_liquidity(liquidity, lower, sqrt_price)?;
        Ok((amount0, amount1))
    } else {
        // Above range: all token1.
        Ok((0, amount1_for_liquidity(liquidity, lower, upper)?))
    }
}

/// Amounts owed when depositing `liquidity` at `sqrt_price`: the
/// rounding-up mirror of [`amounts_for_liquidity`].
pub fn amounts_owed_for_liquidity(
    sqrt_price: u128,
    sqrt_a: u128,
    sqrt_b: u128,
    liquidity: u128,
) -> VaultResult<(u128, u128)> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    if sqrt_price <= lower {
        Ok((amount0_for_liquidity_rounding_up(liquidity, lower, upper)?, 0))
    } else if sqrt_price < upper {
        let amount0 = amount0_for_liquidity_rounding_up(liquidity, sqrt_price, upper)?;
        let amount1 = amount1_for_liquidity_rounding_up(liquidity, lower, sqrt_price)?;
        Ok((amount0, amount1))
    } else {
        Ok((0, amount1_for_liquidity_rounding_up(liquidity, lower, upper)?))
    }
}

/// Largest liquidity both amounts can back over `[sqrt_a, sqrt_b]` at
/// `sqrt_price`: the min of the per-side liquidities in range, the single
/// relevant side outside it.
pub fn liquidity_for_amounts(
    sqrt_price: u128,
    sqrt_a: u128,
    sqrt_b: u128,
    amount0: u128,
    amount1: u128,
) -> VaultResult<u128> {
    let (lower, upper) = sorted(sqrt_a, sqrt_b);
    if sqrt_price <= lower {
        liquidity_for_amount0(amount0, lower, upper)
    } else if sqrt_price < upper {
        let liquidity0 = liquidity_for_amount0(amount0, sqrt_price, upper)?;
        let liquidity1 = liquidity_for_amount1(amount1, lower, sqrt_price)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        liquidity_for_amount1(amount1, lower, upper)
    }
}
