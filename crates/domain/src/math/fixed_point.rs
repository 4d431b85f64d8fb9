//! Multiply-then-divide with 256-bit intermediate precision.
//!
//! Token amounts and liquidity fit in `u128`; products of two of them do
//! not. Every ratio computation in the vault routes through these helpers
//! so the intermediate never truncates and the rounding direction is
//! explicit at the call site.

use crate::error::{VaultError, VaultResult};
use primitive_types::U256;

/// Returns `a * b / denominator`, flooring the division.
///
/// Fails with [`VaultError::ArithmeticError`] when `denominator` is zero or
/// the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> VaultResult<u128> {
    if denominator == 0 {
        return Err(VaultError::ArithmeticError);
    }
    let product = U256::from(a) * U256::from(b);
    let quotient = product / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(VaultError::ArithmeticError);
    }
    Ok(quotient.as_u128())
}

/// Returns `ceil(a * b / denominator)`.
///
/// Same failure modes as [`mul_div`]. Only used where an over-estimate is
/// the conservative direction.
pub fn mul_div_rounding_up(a: u128, b: u128, denominator: u128) -> VaultResult<u128> {
    if denominator == 0 {
        return Err(VaultError::ArithmeticError);
    }
    let product = U256::from(a) * U256::from(b);
    let den = U256::from(denominator);
    let quotient = product / den;
    let rounded = if product % den == U256::zero() {
        quotient
    } else {
        quotient + U256::one()
    };
    if rounded > U256::from(u128::MAX) {
        return Err(VaultError::ArithmeticError);
    }
    Ok(rounded.as_u128())
}

/// Checked addition mapped onto the vault error taxonomy.
pub fn checked_add(a: u128, b: u128) -> VaultResult<u128> {
    a.checked_add(b).ok_or(VaultError::ArithmeticError)
}

/// Checked subtraction mapped onto the vault error taxonomy.
pub fn checked_sub(a: u128, b: u128) -> VaultResult<u128> {
    a.checked_sub(b).ok_or(VaultError::ArithmeticError)
}
