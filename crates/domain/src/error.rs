//! Error taxonomy shared across the workspace.
//!
//! Every failure is terminal for the current operation: there is no local
//! recovery, callers are expected to resubmit.

use thiserror::Error;

/// Failures surfaced by vault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// A caller-supplied argument was rejected before any state change.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// A computed output fell below the caller's or the policy's minimum.
    #[error("slippage exceeded: computed {amount}, minimum {minimum}")]
    SlippageExceeded { amount: u128, minimum: u128 },

    /// A gated setter was called by someone other than the owner.
    #[error("caller is not the vault owner")]
    Unauthorized,

    /// Claim price queried while no claims are outstanding.
    #[error("claim supply is zero")]
    EmptySupply,

    /// A query required an active position when none exists.
    #[error("no active position")]
    NoPosition,

    /// Integer overflow or division by zero.
    #[error("arithmetic overflow or division by zero")]
    ArithmeticError,

    /// A computed tick range fell outside the venue's global tick bounds.
    #[error("tick range [{lower}, {upper}] outside venue bounds")]
    RangeOutOfBounds { lower: i32, upper: i32 },

    /// Opaque propagation of an external venue call failing.
    #[error("venue call failed: {0}")]
    VenueFailure(String),
}

/// Convenience alias used throughout the workspace.
pub type VaultResult<T> = Result<T, VaultError>;
