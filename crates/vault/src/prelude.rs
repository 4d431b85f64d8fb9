//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate
//! and its dependencies.
//!
//! # Example
//!
//! ```rust
//! use range_vault_core::prelude::*;
//! ```

pub use crate::accounting::{BOOTSTRAP_SHARES, CLAIM_PRICE_SCALE};
pub use crate::config::VaultConfig;
pub use crate::policy::RangeStatus;
pub use crate::valuation::PriceSnapshot;
pub use crate::vault::{RangeVault, Reserves, VaultParams};

pub use range_vault_domain::types::{Asset, FEE_DENOMINATOR, TickRange};
pub use range_vault_domain::{VaultError, VaultResult};
pub use range_vault_venues::{
    MintParams, MintReceipt, PositionInfo, PositionVenue, ShareLedger, SwapVenue,
};
