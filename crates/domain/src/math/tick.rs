//! Tick geometry: the discretized log-price grid.
//!
//! Sqrt prices are Q64.64 fixed point (`1 << 64` is 1.0). Tick `t`
//! corresponds to sqrt(1.0001^t); the conversion uses the standard
//! bit-by-bit coefficient product so it is exact, deterministic, and
//! monotonic, and the inverse is a binary search over it.

use crate::error::{VaultError, VaultResult};
use crate::math::fixed_point::mul_div;
use crate::types::TickRange;

/// Smallest tick the venue price grid supports.
pub const MIN_TICK: i32 = -443_636;
/// Largest tick the venue price grid supports.
pub const MAX_TICK: i32 = 443_636;

/// 1.0 in Q64.64.
pub const ONE_X64: u128 = 1 << 64;

/// Sqrt price at [`MIN_TICK`].
pub const MIN_SQRT_PRICE_X64: u128 = 4_295_048_016;
/// Sqrt price at [`MAX_TICK`].
pub const MAX_SQRT_PRICE_X64: u128 = 79_226_673_515_401_279_992_447_579_055;

// sqrt(1.0001^-(2^i)) in Q64.64, i = 0..=18. 2^18 covers |tick| <= MAX_TICK.
const POW2_COEFF: [u128; 19] = [
    0xfffcb933bd6fad38,
    0xfff97272373d4132,
    0xfff2e50f5f656933,
    0xffe5caca7e10e4e6,
    0xffcb9843d60f615a,
    0xff973b41fa98c081,
    0xff2ea16466c96a38,
    0xfe5dee046a99a2a8,
    0xfcbe86c7900a88af,
    0xf987a7253ac41317,
    0xf3392b0822b70006,
    0xe7159475a2c29b74,
    0xd097f3bdfd2022b9,
    0xa9f746462d870fe0,
    0x70d869a156d2a1b9,
    0x31be135f97d08fda,
    0x09aa508b5b7a84e2,
    0x005d6af8dedb8119,
    0x00002216e584f5fa,
];

/// Returns sqrt(1.0001^tick) in Q64.64.
pub fn sqrt_price_at_tick(tick: i32) -> VaultResult<u128> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(VaultError::InvalidInput("tick out of bounds"));
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio = ONE_X64;
    for (bit, coeff) in POW2_COEFF.iter().enumerate() {
        if abs_tick & (1 << bit) != 0 {
            ratio = mul_div(ratio, *coeff, ONE_X64)?;
        }
    }

    // The coefficients encode negative ticks; invert for positive ones.
    if tick > 0 {
        ratio = mul_div(ONE_X64, ONE_X64, ratio)?;
    }

    Ok(ratio.clamp(MIN_SQRT_PRICE_X64, MAX_SQRT_PRICE_X64))
}

/// Returns the greatest tick whose sqrt price is <= `sqrt_price_x64`.
///
/// Inverse of [`sqrt_price_at_tick`]; monotonic and deterministic.
pub fn tick_at_sqrt_price(sqrt_price_x64: u128) -> VaultResult<i32> {
    if !(MIN_SQRT_PRICE_X64..=MAX_SQRT_PRICE_X64).contains(&sqrt_price_x64) {
        return Err(VaultError::InvalidInput("sqrt price out of bounds"));
    }

    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if sqrt_price_at_tick(mid)? <= sqrt_price_x64 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

/// Floors `tick` toward negative infinity to the nearest multiple of
/// `spacing`.
///
/// Truncating toward zero would silently shift ranges upward for negative
/// ticks, so the remainder is Euclidean.
pub fn round_to_spacing(tick: i32, spacing: i32) -> VaultResult<i32> {
    if spacing <= 0 {
        return Err(VaultError::InvalidInput("tick spacing must be positive"));
    }
    Ok(tick - tick.rem_euclid(spacing))
}

/// A range width is usable when it lands on the spacing grid and spans at
/// least two spacings.
pub fn is_range_width_valid(width: i32, spacing: i32) -> bool {
    spacing > 0 && width > 0 && width % spacing == 0 && width >= 2 * spacing
}

/// Computes the target range centered on the spacing-floored current tick.
///
/// The half-width below center is `width - width / 2`: an odd width yields
/// an asymmetric range, one tick wider below center.
pub fn desired_range_for_tick(
    current_tick: i32,
    spacing: i32,
    width: i32,
) -> VaultResult<TickRange> {
    let center = round_to_spacing(current_tick, spacing)?;
    let half = width / 2;
    let lower = center - (width - half);
    let upper = center + half;
    if lower < MIN_TICK || upper > MAX_TICK {
        return Err(VaultError::RangeOutOfBounds { lower, upper });
    }
    Ok(TickRange::new(lower, upper))
}
