//! External collaborator contracts for the range vault.
//!
//! The vault core talks to three capabilities: the concentrated-liquidity
//! market it holds a position on, the venue it routes balancing swaps
//! through, and the ledger that mints/burns claim tokens. All three are
//! injected traits so the core runs unchanged against a live adapter or
//! the in-memory [`sim::SimulatedVenue`].
//!
//! Adapter failures are opaque to the core: every method returns
//! `anyhow::Result` and the engine wraps whatever comes back into its own
//! venue-failure variant.

pub mod sim;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Live attributes of a venue position. Always re-read, never cached:
/// fee accrual and concurrent venue activity can change them between
/// calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

/// Inputs for opening a new venue position.
#[derive(Debug, Clone)]
pub struct MintParams {
    pub token0: String,
    pub token1: String,
    pub fee_rate: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0: u128,
    pub amount1: u128,
}

/// Outcome of a mint: the venue handle plus the amounts the venue
/// actually consumed (it takes what the minted liquidity needs and leaves
/// the remainder with the caller).
#[derive(Debug, Clone, Copy)]
pub struct MintReceipt {
    pub position_id: u64,
    pub used0: u128,
    pub used1: u128,
}

/// The concentrated-liquidity market the vault keeps its position on.
///
/// All calls fail loudly rather than partially apply.
#[async_trait]
pub trait PositionVenue: Send + Sync {
    /// Current pool sqrt price, Q64.64.
    async fn current_sqrt_price(&self) -> Result<u128>;

    /// Granularity a range boundary may use.
    async fn tick_spacing(&self) -> Result<i32>;

    /// Venue swap fee in parts per million.
    async fn fee_rate(&self) -> Result<u32>;

    /// Opens a position over the given range, consuming up to the given
    /// amounts.
    async fn mint(&self, params: MintParams) -> Result<MintReceipt>;

    /// Adds liquidity to an existing position; returns the amounts
    /// consumed.
    async fn increase_liquidity(
        &self,
        position_id: u64,
        amount0: u128,
        amount1: u128,
    ) -> Result<(u128, u128)>;

    /// Removes liquidity from a position. Freed tokens become collectable.
    async fn decrease_liquidity(&self, position_id: u64, liquidity: u128) -> Result<()>;

    /// Transfers out everything collectable on the position (freed
    /// principal plus accrued fees).
    async fn collect(&self, position_id: u64) -> Result<(u128, u128)>;

    /// Live bounds and liquidity of a position.
    async fn position_info(&self, position_id: u64) -> Result<PositionInfo>;
}

/// Market-order execution with a minimum-output guard.
#[async_trait]
pub trait SwapVenue: Send + Sync {
    /// Swaps exactly `amount_in`; fails (no partial fill) when the output
    /// would be below `min_amount_out`.
    async fn swap_exact_in(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<u128>;
}

/// Fungible claim-token bookkeeping. Standard token semantics assumed.
#[async_trait]
pub trait ShareLedger: Send + Sync {
    async fn mint(&self, to: &str, amount: u128) -> Result<()>;
    async fn burn(&self, from: &str, amount: u128) -> Result<()>;
    async fn total_supply(&self) -> Result<u128>;
    async fn balance_of(&self, account: &str) -> Result<u128>;
}
