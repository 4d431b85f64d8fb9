//! The rebalance engine: harvest, re-center, redeploy.
//!
//! Runs at the end of every deposit and withdrawal and on the explicit
//! trigger. The position's status (no-position / in-range / stale) is
//! derived from venue reads each time, never stored. Any venue failure
//! aborts the whole triggering operation; there is no partial commit and
//! no retry.

use crate::policy::{self, RangeStatus};
use crate::valuation::{self, PriceSnapshot};
use crate::vault::RangeVault;
use crate::venue_err;
use range_vault_domain::VaultResult;
use range_vault_domain::math::liquidity::liquidity_for_amounts;
use range_vault_domain::math::tick::sqrt_price_at_tick;
use range_vault_domain::types::{Asset, TickRange};
use range_vault_venues::{MintParams, PositionVenue, ShareLedger, SwapVenue};
use tracing::{debug, info};

impl<P, S, L> RangeVault<P, S, L>
where
    P: PositionVenue,
    S: SwapVenue,
    L: ShareLedger,
{
    /// One full engine transition against an already-captured snapshot.
    ///
    /// 1. Harvest accrued yield unconditionally.
    /// 2. Close and retarget when the position is stale.
    /// 3. With no position, retarget if the price left the desired range.
    /// 4. Swap idle reserves toward the required ratio and redeploy them.
    pub(crate) async fn run_rebalance(&mut self, snapshot: &PriceSnapshot) -> VaultResult<()> {
        let spacing = self.tick_spacing().await?;

        if let Some(position_id) = self.position_id {
            let (yield0, yield1) = self
                .position_venue
                .collect(position_id)
                .await
                .map_err(venue_err)?;
            self.reserves.credit(Asset::Base, yield0)?;
            self.reserves.credit(Asset::Quote, yield1)?;
            if yield0 > 0 || yield1 > 0 {
                debug!(yield0, yield1, "harvested position yield");
            }

            let info = self
                .position_venue
                .position_info(position_id)
                .await
                .map_err(venue_err)?;
            let actual = TickRange::new(info.tick_lower, info.tick_upper);
            let status = policy::classify(Some(&actual), &self.config.desired_range, snapshot.tick);
            debug!(?status, tick = snapshot.tick, actual = %actual, "position status");

            if status == RangeStatus::Stale {
                if info.liquidity > 0 {
                    self.position_venue
                        .decrease_liquidity(position_id, info.liquidity)
                        .await
                        .map_err(venue_err)?;
                }
                let (freed0, freed1) = self
                    .position_venue
                    .collect(position_id)
                    .await
                    .map_err(venue_err)?;
                self.reserves.credit(Asset::Base, freed0)?;
                self.reserves.credit(Asset::Quote, freed1)?;
                self.position_id = None;

                let desired = policy::recompute_desired(
                    snapshot.tick,
                    spacing,
                    self.config.desired_tick_range,
                )?;
                info!(
                    old = %actual,
                    new = %desired,
                    freed0,
                    freed1,
                    "closed stale position"
                );
                self.config.desired_range = desired;
            }
        } else if !self.config.desired_range.contains(snapshot.tick) {
            // No capital deployed yet; keep the target sensible anyway.
            let desired =
                policy::recompute_desired(snapshot.tick, spacing, self.config.desired_tick_range)?;
            debug!(new = %desired, "recentered desired range");
            self.config.desired_range = desired;
        }

        if !self.reserves.is_empty() {
            let venue_fee = self.venue_fee().await?;
            self.swap_idle_to_ratio(snapshot, venue_fee).await?;
            self.deploy_idle(snapshot, venue_fee).await?;
        }
        Ok(())
    }

    /// Swaps the surplus side of the idle reserves so the remainder
    /// matches the ratio the desired range requires.
    async fn swap_idle_to_ratio(
        &mut self,
        snapshot: &PriceSnapshot,
        venue_fee: u32,
    ) -> VaultResult<()> {
        let sized = valuation::swap_to_ratio_amount(
            snapshot,
            &self.config.desired_range,
            self.reserves.base,
            self.reserves.quote,
            venue_fee,
        )?;
        if let Some((sell, amount_in)) = sized {
            self.execute_swap(snapshot, venue_fee, sell, amount_in)
                .await?;
        }
        Ok(())
    }

    /// Executes one swap under the policy slippage floor and applies the
    /// balance movement.
    pub(crate) async fn execute_swap(
        &mut self,
        snapshot: &PriceSnapshot,
        venue_fee: u32,
        sell: Asset,
        amount_in: u128,
    ) -> VaultResult<u128> {
        let estimate = valuation::estimate_swap_output(snapshot, venue_fee, sell, amount_in)?;
        let min_out = valuation::min_acceptable_output(estimate, self.config.slippage_num)?;
        let (token_in, token_out) = match sell {
            Asset::Base => (self.config.token0.as_str(), self.config.token1.as_str()),
            Asset::Quote => (self.config.token1.as_str(), self.config.token0.as_str()),
        };
        let amount_out = self
            .swap_venue
            .swap_exact_in(token_in, token_out, amount_in, min_out)
            .await
            .map_err(venue_err)?;
        self.reserves.debit(sell, amount_in)?;
        self.reserves.credit(sell.other(), amount_out)?;
        debug!(sell = %sell, amount_in, amount_out, min_out, "balancing swap executed");
        Ok(amount_out)
    }

    /// Deploys all idle balances into the desired range: grows the
    /// existing position when one is open, mints a fresh one otherwise.
    ///
    /// Mint and increase carry no minimum-output guard; slippage
    /// protection already happened at the swap step, and the deposit
    /// consumes only what the computed liquidity needs. Skips entirely
    /// when the deployable liquidity floors to zero, so dust never
    /// churns the position.
    async fn deploy_idle(&mut self, snapshot: &PriceSnapshot, venue_fee: u32) -> VaultResult<()> {
        let desired = self.config.desired_range;
        let sqrt_lower = sqrt_price_at_tick(desired.lower)?;
        let sqrt_upper = sqrt_price_at_tick(desired.upper)?;
        let deployable = liquidity_for_amounts(
            snapshot.sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            self.reserves.base,
            self.reserves.quote,
        )?;
        if deployable == 0 {
            debug!(
                base = self.reserves.base,
                quote = self.reserves.quote,
                "idle reserves below deployable threshold"
            );
            return Ok(());
        }

        match self.position_id {
            Some(position_id) => {
                let (used0, used1) = self
                    .position_venue
                    .increase_liquidity(position_id, self.reserves.base, self.reserves.quote)
                    .await
                    .map_err(venue_err)?;
                self.reserves.debit(Asset::Base, used0)?;
                self.reserves.debit(Asset::Quote, used1)?;
                info!(position_id, used0, used1, "increased position liquidity");
            }
            None => {
                let receipt = self
                    .position_venue
                    .mint(MintParams {
                        token0: self.config.token0.clone(),
                        token1: self.config.token1.clone(),
                        fee_rate: venue_fee,
                        tick_lower: desired.lower,
                        tick_upper: desired.upper,
                        amount0: self.reserves.base,
                        amount1: self.reserves.quote,
                    })
                    .await
                    .map_err(venue_err)?;
                self.reserves.debit(Asset::Base, receipt.used0)?;
                self.reserves.debit(Asset::Quote, receipt.used1)?;
                self.position_id = Some(receipt.position_id);
                info!(
                    position_id = receipt.position_id,
                    range = %desired,
                    used0 = receipt.used0,
                    used1 = receipt.used1,
                    "opened position"
                );
            }
        }
        Ok(())
    }
}
