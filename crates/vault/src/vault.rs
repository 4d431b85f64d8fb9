//! The vault aggregate: state, public operations, and the read surface.
//!
//! One instance wraps one venue position at most. Operations take
//! `&mut self`, so the borrow checker enforces the serialized execution
//! model: a call always sees the state exactly as the previous call left
//! it. Each operation validates and prices everything it can before the
//! first venue mutation; once venue calls start, any failure aborts the
//! whole operation and surfaces to the caller.

use crate::accounting;
use crate::config::{VaultConfig, ensure_fraction};
use crate::valuation::{self, PriceSnapshot};
use crate::venue_err;
use range_vault_domain::math::fixed_point::{checked_add, checked_sub};
use range_vault_domain::math::tick::is_range_width_valid;
use range_vault_domain::types::{Asset, TickRange};
use range_vault_domain::{VaultError, VaultResult};
use range_vault_venues::{PositionVenue, ShareLedger, SwapVenue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Idle balances held by the vault outside the position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub base: u128,
    pub quote: u128,
}

impl Reserves {
    /// Balance of one side.
    #[must_use]
    pub fn of(&self, asset: Asset) -> u128 {
        match asset {
            Asset::Base => self.base,
            Asset::Quote => self.quote,
        }
    }

    /// True when both sides are zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base == 0 && self.quote == 0
    }

    pub(crate) fn credit(&mut self, asset: Asset, amount: u128) -> VaultResult<()> {
        let slot = match asset {
            Asset::Base => &mut self.base,
            Asset::Quote => &mut self.quote,
        };
        *slot = checked_add(*slot, amount)?;
        Ok(())
    }

    pub(crate) fn debit(&mut self, asset: Asset, amount: u128) -> VaultResult<()> {
        let slot = match asset {
            Asset::Base => &mut self.base,
            Asset::Quote => &mut self.quote,
        };
        *slot = checked_sub(*slot, amount)?;
        Ok(())
    }
}

/// Construction inputs for a vault instance.
#[derive(Debug, Clone)]
pub struct VaultParams {
    pub owner: String,
    pub token0: String,
    pub token1: String,
    pub protocol_fee_num: u128,
    pub slippage_num: u128,
    pub desired_tick_range: i32,
}

/// Automated liquidity-management vault over one concentrated-liquidity
/// position.
pub struct RangeVault<P, S, L> {
    pub(crate) position_venue: Arc<P>,
    pub(crate) swap_venue: Arc<S>,
    pub(crate) ledger: Arc<L>,
    pub(crate) config: VaultConfig,
    pub(crate) reserves: Reserves,
    pub(crate) position_id: Option<u64>,
}

fn ensure_deadline(deadline: i64) -> VaultResult<()> {
    if chrono::Utc::now().timestamp() > deadline {
        return Err(VaultError::InvalidInput("deadline expired"));
    }
    Ok(())
}

impl<P, S, L> RangeVault<P, S, L>
where
    P: PositionVenue,
    S: SwapVenue,
    L: ShareLedger,
{
    /// Creates a vault and computes its initial target range from the
    /// current venue price.
    pub async fn new(
        position_venue: Arc<P>,
        swap_venue: Arc<S>,
        ledger: Arc<L>,
        params: VaultParams,
    ) -> VaultResult<Self> {
        ensure_fraction(params.protocol_fee_num)?;
        ensure_fraction(params.slippage_num)?;

        let spacing = position_venue.tick_spacing().await.map_err(venue_err)?;
        if !is_range_width_valid(params.desired_tick_range, spacing) {
            return Err(VaultError::InvalidInput("invalid tick range width"));
        }
        let snapshot = PriceSnapshot::capture(position_venue.as_ref()).await?;
        let desired_range =
            crate::policy::recompute_desired(snapshot.tick, spacing, params.desired_tick_range)?;

        info!(
            owner = %params.owner,
            tick = snapshot.tick,
            desired = %desired_range,
            "vault initialized"
        );

        Ok(Self {
            position_venue,
            swap_venue,
            ledger,
            config: VaultConfig {
                owner: params.owner,
                token0: params.token0,
                token1: params.token1,
                protocol_fee_num: params.protocol_fee_num,
                slippage_num: params.slippage_num,
                desired_tick_range: params.desired_tick_range,
                desired_range,
            },
            reserves: Reserves::default(),
            position_id: None,
        })
    }

    /// Deposits up to two assets and mints claim tokens for the value
    /// added.
    ///
    /// The first deposit into an empty vault mints the fixed bootstrap
    /// amount regardless of the deposited ratio; afterwards claims are
    /// proportional to the value increase, scaled down by the protocol
    /// fee. `min_shares` is the caller's only slippage guard here.
    pub async fn deposit(
        &mut self,
        caller: &str,
        amount0: u128,
        amount1: u128,
        min_shares: u128,
        deadline: i64,
    ) -> VaultResult<u128> {
        ensure_deadline(deadline)?;
        if amount0 == 0 && amount1 == 0 {
            return Err(VaultError::InvalidInput("empty deposit"));
        }

        let snapshot = self.snapshot().await?;
        let venue_fee = self.venue_fee().await?;
        let supply = self.ledger.total_supply().await.map_err(venue_err)?;
        let value_before = self.total_value_at(&snapshot, Asset::Base, venue_fee).await?;

        // Stage: price the deposit against the same snapshot before any
        // state moves.
        let shares = if supply == 0 || value_before == 0 {
            accounting::BOOTSTRAP_SHARES
        } else {
            let deposit_value =
                valuation::reserve_value(Asset::Base, amount0, amount1, &snapshot, venue_fee)?;
            let value_after = checked_add(value_before, deposit_value)?;
            accounting::shares_for_deposit(
                value_before,
                value_after,
                supply,
                self.config.protocol_fee_num,
            )?
        };
        if shares < min_shares {
            return Err(VaultError::SlippageExceeded {
                amount: shares,
                minimum: min_shares,
            });
        }

        // Apply: funds arrive, claims mint.
        self.reserves.credit(Asset::Base, amount0)?;
        self.reserves.credit(Asset::Quote, amount1)?;
        self.ledger.mint(caller, shares).await.map_err(venue_err)?;
        info!(caller = %caller, amount0, amount1, shares, "deposit accepted");

        self.run_rebalance(&snapshot).await?;
        Ok(shares)
    }

    /// Burns claim tokens and pays out in the requested asset.
    ///
    /// Unwinds the claim's share of the position, converts the
    /// non-requested side fully into the requested one under the
    /// slippage floor, caps the payout at what actually materialized,
    /// and applies the protocol fee. Claims burn only after the payout
    /// leaves the vault.
    pub async fn withdraw(
        &mut self,
        caller: &str,
        shares: u128,
        asset: Asset,
        min_amount_out: u128,
        deadline: i64,
    ) -> VaultResult<u128> {
        ensure_deadline(deadline)?;
        if shares == 0 {
            return Err(VaultError::InvalidInput("zero claim amount"));
        }
        let balance = self.ledger.balance_of(caller).await.map_err(venue_err)?;
        if balance < shares {
            return Err(VaultError::InvalidInput("claim amount exceeds balance"));
        }
        let supply = self.ledger.total_supply().await.map_err(venue_err)?;
        if supply == 0 {
            return Err(VaultError::EmptySupply);
        }

        let snapshot = self.snapshot().await?;
        let venue_fee = self.venue_fee().await?;

        // Pre-fee estimate from current total value; the payout never
        // exceeds it.
        let total = self.total_value_at(&snapshot, asset, venue_fee).await?;
        let payout_cap = accounting::payout_for_shares(total, shares, supply)?;

        // Unwind the claim's share of the position.
        if let Some(position_id) = self.position_id {
            let info = self
                .position_venue
                .position_info(position_id)
                .await
                .map_err(venue_err)?;
            let to_unwind = accounting::proportional_liquidity(info.liquidity, shares, supply)?;
            if to_unwind > 0 {
                self.position_venue
                    .decrease_liquidity(position_id, to_unwind)
                    .await
                    .map_err(venue_err)?;
            }
            let (collected0, collected1) = self
                .position_venue
                .collect(position_id)
                .await
                .map_err(venue_err)?;
            self.reserves.credit(Asset::Base, collected0)?;
            self.reserves.credit(Asset::Quote, collected1)?;
        }

        // Everything not requested becomes the requested asset.
        let other = asset.other();
        let other_balance = self.reserves.of(other);
        if other_balance > 0 {
            self.execute_swap(&snapshot, venue_fee, other, other_balance)
                .await?;
        }

        let available = self.reserves.of(asset);
        let gross = payout_cap.min(available);
        let net = accounting::apply_protocol_fee(gross, self.config.protocol_fee_num)?;
        if net < min_amount_out {
            return Err(VaultError::SlippageExceeded {
                amount: net,
                minimum: min_amount_out,
            });
        }

        self.reserves.debit(asset, net)?;
        self.ledger.burn(caller, shares).await.map_err(venue_err)?;
        info!(caller = %caller, shares, asset = %asset, payout = net, "withdrawal paid");

        self.run_rebalance(&snapshot).await?;
        Ok(net)
    }

    /// Explicit rebalance trigger; callable by anyone.
    pub async fn rebalance(&mut self) -> VaultResult<()> {
        let snapshot = self.snapshot().await?;
        self.run_rebalance(&snapshot).await
    }

    /// Updates the protocol fee numerator. Owner only.
    pub async fn set_fee_numerator(&mut self, caller: &str, numerator: u128) -> VaultResult<()> {
        self.ensure_owner(caller)?;
        if numerator == self.config.protocol_fee_num {
            return Err(VaultError::InvalidInput("fee numerator unchanged"));
        }
        ensure_fraction(numerator)?;
        self.config.protocol_fee_num = numerator;
        info!(numerator, "protocol fee updated");
        Ok(())
    }

    /// Updates the slippage tolerance numerator. Owner only.
    pub async fn set_slippage_numerator(
        &mut self,
        caller: &str,
        numerator: u128,
    ) -> VaultResult<()> {
        self.ensure_owner(caller)?;
        if numerator == self.config.slippage_num {
            return Err(VaultError::InvalidInput("slippage numerator unchanged"));
        }
        ensure_fraction(numerator)?;
        self.config.slippage_num = numerator;
        info!(numerator, "slippage tolerance updated");
        Ok(())
    }

    /// Updates the target range width and immediately recomputes the
    /// desired bounds from the current price. Owner only.
    pub async fn set_desired_tick_range(&mut self, caller: &str, width: i32) -> VaultResult<()> {
        self.ensure_owner(caller)?;
        if width == self.config.desired_tick_range {
            return Err(VaultError::InvalidInput("tick range unchanged"));
        }
        let spacing = self.tick_spacing().await?;
        if !is_range_width_valid(width, spacing) {
            return Err(VaultError::InvalidInput("invalid tick range width"));
        }
        let snapshot = self.snapshot().await?;
        let desired = crate::policy::recompute_desired(snapshot.tick, spacing, width)?;
        self.config.desired_tick_range = width;
        self.config.desired_range = desired;
        info!(width, desired = %desired, "target range retuned");
        Ok(())
    }

    // ---- read surface -----------------------------------------------------

    /// Current venue tick.
    pub async fn current_tick(&self) -> VaultResult<i32> {
        Ok(self.snapshot().await?.tick)
    }

    /// The policy's target bounds.
    #[must_use]
    pub fn desired_range(&self) -> TickRange {
        self.config.desired_range
    }

    /// Live bounds of the open position.
    pub async fn actual_range(&self) -> VaultResult<TickRange> {
        let position_id = self.position_id.ok_or(VaultError::NoPosition)?;
        let info = self
            .position_venue
            .position_info(position_id)
            .await
            .map_err(venue_err)?;
        Ok(TickRange::new(info.tick_lower, info.tick_upper))
    }

    /// Liquidity of the open position.
    pub async fn position_liquidity(&self) -> VaultResult<u128> {
        let position_id = self.position_id.ok_or(VaultError::NoPosition)?;
        let info = self
            .position_venue
            .position_info(position_id)
            .await
            .map_err(venue_err)?;
        Ok(info.liquidity)
    }

    /// Venue handle of the open position, if any.
    #[must_use]
    pub fn position_id(&self) -> Option<u64> {
        self.position_id
    }

    /// Idle balances held outside the position.
    #[must_use]
    pub fn idle_reserves(&self) -> Reserves {
        self.reserves
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Value of the idle reserves in `asset` terms.
    pub async fn reserve_value(&self, asset: Asset) -> VaultResult<u128> {
        let snapshot = self.snapshot().await?;
        let venue_fee = self.venue_fee().await?;
        valuation::reserve_value(
            asset,
            self.reserves.base,
            self.reserves.quote,
            &snapshot,
            venue_fee,
        )
    }

    /// Value of the position in `asset` terms; zero when no position is
    /// open.
    pub async fn position_value(&self, asset: Asset) -> VaultResult<u128> {
        let snapshot = self.snapshot().await?;
        let venue_fee = self.venue_fee().await?;
        self.position_value_at(&snapshot, asset, venue_fee).await
    }

    /// Total vault value in `asset` terms.
    pub async fn total_value(&self, asset: Asset) -> VaultResult<u128> {
        let snapshot = self.snapshot().await?;
        let venue_fee = self.venue_fee().await?;
        self.total_value_at(&snapshot, asset, venue_fee).await
    }

    /// Price of one claim token in `asset` terms, scaled by
    /// [`accounting::CLAIM_PRICE_SCALE`].
    pub async fn claim_price(&self, asset: Asset) -> VaultResult<u128> {
        let supply = self.ledger.total_supply().await.map_err(venue_err)?;
        let total = self.total_value(asset).await?;
        accounting::claim_price(total, supply)
    }

    /// Whether the current price sits inside the desired range.
    pub async fn price_in_desired_range(&self) -> VaultResult<bool> {
        let snapshot = self.snapshot().await?;
        Ok(self.config.desired_range.contains(snapshot.tick))
    }

    /// Whether the current price sits inside the live position's bounds.
    pub async fn price_in_actual_range(&self) -> VaultResult<bool> {
        let snapshot = self.snapshot().await?;
        let actual = self.actual_range().await?;
        Ok(actual.contains(snapshot.tick))
    }

    /// Whether the open position is stale relative to policy. False when
    /// no position exists.
    pub async fn needs_update(&self) -> VaultResult<bool> {
        let Some(position_id) = self.position_id else {
            return Ok(false);
        };
        let snapshot = self.snapshot().await?;
        let info = self
            .position_venue
            .position_info(position_id)
            .await
            .map_err(venue_err)?;
        let actual = TickRange::new(info.tick_lower, info.tick_upper);
        Ok(crate::policy::needs_update(
            &actual,
            &self.config.desired_range,
            snapshot.tick,
        ))
    }

    // ---- internals --------------------------------------------------------

    pub(crate) async fn snapshot(&self) -> VaultResult<PriceSnapshot> {
        PriceSnapshot::capture(self.position_venue.as_ref()).await
    }

    pub(crate) async fn venue_fee(&self) -> VaultResult<u32> {
        self.position_venue.fee_rate().await.map_err(venue_err)
    }

    pub(crate) async fn tick_spacing(&self) -> VaultResult<i32> {
        self.position_venue.tick_spacing().await.map_err(venue_err)
    }

    pub(crate) async fn position_value_at(
        &self,
        snapshot: &PriceSnapshot,
        asset: Asset,
        venue_fee: u32,
    ) -> VaultResult<u128> {
        let Some(position_id) = self.position_id else {
            return Ok(0);
        };
        let info = self
            .position_venue
            .position_info(position_id)
            .await
            .map_err(venue_err)?;
        valuation::position_value(
            asset,
            snapshot,
            &self.config.desired_range,
            info.liquidity,
            venue_fee,
        )
    }

    pub(crate) async fn total_value_at(
        &self,
        snapshot: &PriceSnapshot,
        asset: Asset,
        venue_fee: u32,
    ) -> VaultResult<u128> {
        let reserve = valuation::reserve_value(
            asset,
            self.reserves.base,
            self.reserves.quote,
            snapshot,
            venue_fee,
        )?;
        let position = self.position_value_at(snapshot, asset, venue_fee).await?;
        checked_add(reserve, position)
    }

    fn ensure_owner(&self, caller: &str) -> VaultResult<()> {
        if caller != self.config.owner {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }
}
