//! Deterministic in-memory venue for tests and demos.
//!
//! One virtual pool: constant spot price (settable), exact
//! liquidity/amount math from the domain crate, per-position owed
//! buckets, spot-price swap fills, and a balances-map share ledger. A
//! single instance implements all three collaborator traits, so the
//! vault under test talks to one consistent market.

use crate::{MintParams, MintReceipt, PositionInfo, PositionVenue, ShareLedger, SwapVenue};
use anyhow::{Result, bail, ensure};
use async_trait::async_trait;
use range_vault_domain::math::fixed_point::mul_div;
use range_vault_domain::math::liquidity::{
    amounts_for_liquidity, amounts_owed_for_liquidity, liquidity_for_amounts,
};
use range_vault_domain::math::tick::{ONE_X64, sqrt_price_at_tick};
use range_vault_domain::types::FEE_DENOMINATOR;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct SimPosition {
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
    owed0: u128,
    owed1: u128,
}

#[derive(Debug)]
struct SimState {
    sqrt_price_x64: u128,
    tick_spacing: i32,
    fee_rate: u32,
    token0: String,
    token1: String,
    next_position_id: u64,
    positions: HashMap<u64, SimPosition>,
    supply: u128,
    balances: HashMap<String, u128>,
}

/// Simulated pool + swap venue + share ledger behind one mutex.
#[derive(Debug)]
pub struct SimulatedVenue {
    state: Mutex<SimState>,
}

impl SimulatedVenue {
    /// Creates a venue for one pool.
    #[must_use]
    pub fn new(
        token0: impl Into<String>,
        token1: impl Into<String>,
        sqrt_price_x64: u128,
        tick_spacing: i32,
        fee_rate: u32,
    ) -> Self {
        Self {
            state: Mutex::new(SimState {
                sqrt_price_x64,
                tick_spacing,
                fee_rate,
                token0: token0.into(),
                token1: token1.into(),
                next_position_id: 1,
                positions: HashMap::new(),
                supply: 0,
                balances: HashMap::new(),
            }),
        }
    }

    /// Moves the spot price. Takes effect for every later call.
    pub async fn set_sqrt_price(&self, sqrt_price_x64: u128) {
        self.state.lock().await.sqrt_price_x64 = sqrt_price_x64;
    }

    /// Current spot price, Q64.64.
    pub async fn sqrt_price(&self) -> u128 {
        self.state.lock().await.sqrt_price_x64
    }

    /// Credits uncollected fee income to a position.
    pub async fn accrue_fees(&self, position_id: u64, fee0: u128, fee1: u128) -> Result<()> {
        let mut state = self.state.lock().await;
        let position = state
            .positions
            .get_mut(&position_id)
            .ok_or_else(|| anyhow::anyhow!("unknown position {position_id}"))?;
        position.owed0 += fee0;
        position.owed1 += fee1;
        Ok(())
    }
}

impl SimState {
    fn position(&self, position_id: u64) -> Result<&SimPosition> {
        self.positions
            .get(&position_id)
            .ok_or_else(|| anyhow::anyhow!("unknown position {position_id}"))
    }

    fn ensure_pair(&self, token0: &str, token1: &str) -> Result<()> {
        ensure!(
            token0 == self.token0 && token1 == self.token1,
            "unknown token pair {token0}/{token1}"
        );
        Ok(())
    }
}

#[async_trait]
impl PositionVenue for SimulatedVenue {
    async fn current_sqrt_price(&self) -> Result<u128> {
        Ok(self.state.lock().await.sqrt_price_x64)
    }

    async fn tick_spacing(&self) -> Result<i32> {
        Ok(self.state.lock().await.tick_spacing)
    }

    async fn fee_rate(&self) -> Result<u32> {
        Ok(self.state.lock().await.fee_rate)
    }

    async fn mint(&self, params: MintParams) -> Result<MintReceipt> {
        let mut state = self.state.lock().await;
        state.ensure_pair(&params.token0, &params.token1)?;
        ensure!(
            params.tick_lower < params.tick_upper,
            "inverted tick range"
        );
        ensure!(
            params.tick_lower % state.tick_spacing == 0
                && params.tick_upper % state.tick_spacing == 0,
            "tick bounds not aligned to spacing"
        );

        let sqrt_lower = sqrt_price_at_tick(params.tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(params.tick_upper)?;
        let liquidity = liquidity_for_amounts(
            state.sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            params.amount0,
            params.amount1,
        )?;
        ensure!(liquidity > 0, "zero liquidity minted");
        // Deposits owe the rounded-up amounts, capped at what was offered.
        let (owed0, owed1) =
            amounts_owed_for_liquidity(state.sqrt_price_x64, sqrt_lower, sqrt_upper, liquidity)?;
        let (used0, used1) = (owed0.min(params.amount0), owed1.min(params.amount1));

        let position_id = state.next_position_id;
        state.next_position_id += 1;
        state.positions.insert(
            position_id,
            SimPosition {
                tick_lower: params.tick_lower,
                tick_upper: params.tick_upper,
                liquidity,
                owed0: 0,
                owed1: 0,
            },
        );
        Ok(MintReceipt {
            position_id,
            used0,
            used1,
        })
    }

    async fn increase_liquidity(
        &self,
        position_id: u64,
        amount0: u128,
        amount1: u128,
    ) -> Result<(u128, u128)> {
        let mut state = self.state.lock().await;
        let spot = state.sqrt_price_x64;
        let position = state
            .positions
            .get_mut(&position_id)
            .ok_or_else(|| anyhow::anyhow!("unknown position {position_id}"))?;
        let sqrt_lower = sqrt_price_at_tick(position.tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(position.tick_upper)?;

        let added = liquidity_for_amounts(spot, sqrt_lower, sqrt_upper, amount0, amount1)?;
        ensure!(added > 0, "zero liquidity added");
        let (owed0, owed1) = amounts_owed_for_liquidity(spot, sqrt_lower, sqrt_upper, added)?;
        let (used0, used1) = (owed0.min(amount0), owed1.min(amount1));

        position.liquidity += added;
        Ok((used0, used1))
    }

    async fn decrease_liquidity(&self, position_id: u64, liquidity: u128) -> Result<()> {
        let mut state = self.state.lock().await;
        let spot = state.sqrt_price_x64;
        let position = state
            .positions
            .get_mut(&position_id)
            .ok_or_else(|| anyhow::anyhow!("unknown position {position_id}"))?;
        ensure!(
            liquidity <= position.liquidity,
            "insufficient position liquidity"
        );
        let sqrt_lower = sqrt_price_at_tick(position.tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(position.tick_upper)?;
        let (freed0, freed1) = amounts_for_liquidity(spot, sqrt_lower, sqrt_upper, liquidity)?;

        position.liquidity -= liquidity;
        position.owed0 += freed0;
        position.owed1 += freed1;
        Ok(())
    }

    async fn collect(&self, position_id: u64) -> Result<(u128, u128)> {
        let mut state = self.state.lock().await;
        let position = state
            .positions
            .get_mut(&position_id)
            .ok_or_else(|| anyhow::anyhow!("unknown position {position_id}"))?;
        let collected = (position.owed0, position.owed1);
        position.owed0 = 0;
        position.owed1 = 0;
        Ok(collected)
    }

    async fn position_info(&self, position_id: u64) -> Result<PositionInfo> {
        let state = self.state.lock().await;
        let position = state.position(position_id)?;
        Ok(PositionInfo {
            tick_lower: position.tick_lower,
            tick_upper: position.tick_upper,
            liquidity: position.liquidity,
        })
    }
}

#[async_trait]
impl SwapVenue for SimulatedVenue {
    async fn swap_exact_in(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<u128> {
        let state = self.state.lock().await;
        ensure!(token_in != token_out, "same-token swap");
        let spot = state.sqrt_price_x64;
        let raw_out = if token_in == state.token0 && token_out == state.token1 {
            mul_div(mul_div(amount_in, spot, ONE_X64)?, spot, ONE_X64)?
        } else if token_in == state.token1 && token_out == state.token0 {
            mul_div(mul_div(amount_in, ONE_X64, spot)?, ONE_X64, spot)?
        } else {
            bail!("unknown token pair {token_in}/{token_out}");
        };
        let amount_out = mul_div(
            raw_out,
            FEE_DENOMINATOR - u128::from(state.fee_rate),
            FEE_DENOMINATOR,
        )?;
        ensure!(
            amount_out >= min_amount_out,
            "insufficient output: {amount_out} < {min_amount_out}"
        );
        Ok(amount_out)
    }
}

#[async_trait]
impl ShareLedger for SimulatedVenue {
    async fn mint(&self, to: &str, amount: u128) -> Result<()> {
        let mut state = self.state.lock().await;
        state.supply = state
            .supply
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("supply overflow"))?;
        *state.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }

    async fn burn(&self, from: &str, amount: u128) -> Result<()> {
        let mut state = self.state.lock().await;
        let balance = state.balances.entry(from.to_string()).or_insert(0);
        ensure!(*balance >= amount, "burn exceeds balance");
        *balance -= amount;
        state.supply -= amount;
        Ok(())
    }

    async fn total_supply(&self) -> Result<u128> {
        Ok(self.state.lock().await.supply)
    }

    async fn balance_of(&self, account: &str) -> Result<u128> {
        Ok(self
            .state
            .lock()
            .await
            .balances
            .get(account)
            .copied()
            .unwrap_or(0))
    }
}
