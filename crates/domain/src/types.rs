//! Value objects shared across the workspace.

use crate::math::tick::ONE_X64;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Denominator shared by the protocol fee, the slippage tolerance, and
/// venue fee rates.
pub const FEE_DENOMINATOR: u128 = 1_000_000;

/// The two assets backing the vault. `Base` is token0, `Quote` is token1;
/// prices are quoted as token1 per token0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Base,
    Quote,
}

impl Asset {
    /// Returns the other side of the pair.
    #[must_use]
    pub fn other(&self) -> Self {
        match self {
            Self::Base => Self::Quote,
            Self::Quote => Self::Base,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Quote => write!(f, "quote"),
        }
    }
}

/// An inclusive tick range on the venue's price grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
}

impl TickRange {
    /// Creates a new range. Callers are responsible for `lower < upper`.
    #[must_use]
    pub fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    /// Width of the range in ticks.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.upper - self.lower
    }

    /// Inclusive containment check.
    #[must_use]
    pub fn contains(&self, tick: i32) -> bool {
        self.lower <= tick && tick <= self.upper
    }
}

impl fmt::Display for TickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Converts a Q64.64 sqrt price to a display price (token1 per token0).
///
/// Display only: goes through `f64`, so it is approximate. Core math never
/// uses this.
#[must_use]
pub fn sqrt_price_x64_to_price(sqrt_price_x64: u128) -> Decimal {
    let sqrt = sqrt_price_x64 as f64 / ONE_X64 as f64;
    Decimal::from_f64(sqrt * sqrt).unwrap_or(Decimal::ZERO)
}

/// Returns the display price corresponding to a tick: 1.0001^tick.
#[must_use]
pub fn tick_to_price(tick: i32) -> Decimal {
    Decimal::from_f64(1.0001f64.powi(tick)).unwrap_or(Decimal::ZERO)
}
