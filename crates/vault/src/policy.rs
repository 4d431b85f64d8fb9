//! Range policy: decides when the live position no longer matches
//! intent.
//!
//! Status is derived fresh from venue reads on every call, never stored;
//! external state (price moves, owner retunes) can change it between
//! calls.

use range_vault_domain::VaultResult;
use range_vault_domain::math::tick::desired_range_for_tick;
use range_vault_domain::types::TickRange;

/// Where the vault stands relative to its policy target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// No venue position is open.
    NoPosition,
    /// The live position matches the desired range and the price is
    /// inside it.
    InRange,
    /// The live position must be closed and reopened.
    Stale,
}

/// Classifies the live position against the desired range and current
/// tick.
#[must_use]
pub fn classify(actual: Option<&TickRange>, desired: &TickRange, current_tick: i32) -> RangeStatus {
    match actual {
        None => RangeStatus::NoPosition,
        Some(actual) if needs_update(actual, desired, current_tick) => RangeStatus::Stale,
        Some(_) => RangeStatus::InRange,
    }
}

/// A live position is stale when the price has left its actual bounds or
/// when the actual bounds no longer equal the desired ones (the owner
/// retuned the range but it has not been re-minted yet).
#[must_use]
pub fn needs_update(actual: &TickRange, desired: &TickRange, current_tick: i32) -> bool {
    !actual.contains(current_tick) || actual != desired
}

/// Recomputes the desired bounds centered on the current price.
pub fn recompute_desired(current_tick: i32, spacing: i32, width: i32) -> VaultResult<TickRange> {
    desired_range_for_tick(current_tick, spacing, width)
}
