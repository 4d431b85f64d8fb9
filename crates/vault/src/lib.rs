//! Automated liquidity-management vault around a single
//! concentrated-liquidity position.
//!
//! Depositors hand over arbitrary ratios of the two pool assets and
//! receive fungible claim tokens priced against the vault's total value;
//! the rebalance engine harvests yield, re-centers the target range when
//! it goes stale, and redeploys idle balances on every touch. Venues and
//! the claim ledger are injected trait objects, so the whole engine runs
//! against the simulated venue in tests.

pub mod accounting;
pub mod config;
pub mod policy;
pub mod prelude;
pub mod rebalance;
pub mod valuation;
pub mod vault;

pub use config::VaultConfig;
pub use vault::{RangeVault, Reserves, VaultParams};

use range_vault_domain::VaultError;

/// Wraps an adapter failure into the vault's opaque venue-failure
/// variant.
pub(crate) fn venue_err(err: anyhow::Error) -> VaultError {
    VaultError::VenueFailure(err.to_string())
}
