//! Claim-token mint and payout arithmetic.
//!
//! All divisions floor, which biases every mint and payout in the vault's
//! favor: a depositor never receives more claims than their value added,
//! a withdrawer never receives more than their claim share.

use range_vault_domain::math::fixed_point::{checked_sub, mul_div};
use range_vault_domain::types::FEE_DENOMINATOR;
use range_vault_domain::{VaultError, VaultResult};

/// Claims minted by the first deposit into an empty vault, independent of
/// the deposited amounts. The first depositor sets the implicit price.
pub const BOOTSTRAP_SHARES: u128 = 1_000_000_000;

/// Scale factor applied to claim-price quotes (9 decimals).
pub const CLAIM_PRICE_SCALE: u128 = 1_000_000_000;

/// Claims minted for a deposit that moved total value from
/// `value_before` to `value_after`, fee applied.
///
/// mint = supply * (after - before) / before * (1 - fee)
pub fn shares_for_deposit(
    value_before: u128,
    value_after: u128,
    supply: u128,
    protocol_fee_num: u128,
) -> VaultResult<u128> {
    let gained = checked_sub(value_after, value_before)?;
    let gross = mul_div(gained, supply, value_before)?;
    apply_protocol_fee(gross, protocol_fee_num)
}

/// Pre-fee payout estimate for burning `shares` out of `supply`.
pub fn payout_for_shares(total_value: u128, shares: u128, supply: u128) -> VaultResult<u128> {
    mul_div(total_value, shares, supply)
}

/// Position liquidity to unwind for a claim share.
pub fn proportional_liquidity(liquidity: u128, shares: u128, supply: u128) -> VaultResult<u128> {
    mul_div(liquidity, shares, supply)
}

/// Deducts the protocol fee from an amount.
pub fn apply_protocol_fee(amount: u128, protocol_fee_num: u128) -> VaultResult<u128> {
    mul_div(amount, FEE_DENOMINATOR - protocol_fee_num, FEE_DENOMINATOR)
}

/// Price of one claim in terms of total value, scaled by
/// [`CLAIM_PRICE_SCALE`]. Undefined before the first deposit.
pub fn claim_price(total_value: u128, supply: u128) -> VaultResult<u128> {
    if supply == 0 {
        return Err(VaultError::EmptySupply);
    }
    mul_div(total_value, CLAIM_PRICE_SCALE, supply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proportional_mint_tracks_value_fraction() {
        // A 10% value increase mints 10% of supply, pre-fee.
        let shares = shares_for_deposit(1_000_000, 1_100_000, 5_000_000, 0).unwrap();
        assert_eq!(shares, 500_000);
    }

    #[test]
    fn test_mint_fee_scales_down() {
        // 1% fee on a 10% increase.
        let shares = shares_for_deposit(1_000_000, 1_100_000, 5_000_000, 10_000).unwrap();
        assert_eq!(shares, 495_000);
    }

    #[test]
    fn test_deposit_with_no_value_gain_mints_nothing() {
        assert_eq!(shares_for_deposit(1_000_000, 1_000_000, 5_000_000, 0).unwrap(), 0);
    }

    #[test]
    fn test_value_decrease_is_arithmetic_error() {
        assert_eq!(
            shares_for_deposit(1_000_000, 999_999, 5_000_000, 0),
            Err(VaultError::ArithmeticError)
        );
    }

    #[test]
    fn test_payout_proportional_to_claim_share() {
        assert_eq!(payout_for_shares(2_000_000, 1, 4).unwrap(), 500_000);
        assert_eq!(payout_for_shares(2_000_000, 4, 4).unwrap(), 2_000_000);
    }

    #[test]
    fn test_apply_protocol_fee() {
        assert_eq!(apply_protocol_fee(1_000_000, 0).unwrap(), 1_000_000);
        assert_eq!(apply_protocol_fee(1_000_000, 5_000).unwrap(), 995_000);
        assert_eq!(apply_protocol_fee(1_000_000, FEE_DENOMINATOR).unwrap(), 0);
    }

    #[test]
    fn test_claim_price_scaled() {
        assert_eq!(
            claim_price(2_000_000, BOOTSTRAP_SHARES).unwrap(),
            2_000_000
        );
    }

    #[test]
    fn test_claim_price_empty_supply() {
        assert_eq!(claim_price(1_000, 0), Err(VaultError::EmptySupply));
    }
}
