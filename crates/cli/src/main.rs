//! Command Line Interface for the range vault.
//!
//! Drives the vault against the simulated venue: a scripted lifecycle
//! demo and a random-walk stress run.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use range_vault_core::prelude::*;
use range_vault_domain::math::tick::{MAX_SQRT_PRICE_X64, MIN_SQRT_PRICE_X64, ONE_X64};
use range_vault_domain::types::sqrt_price_x64_to_price;
use range_vault_venues::sim::SimulatedVenue;
use std::sync::Arc;
use tracing::info;

const OWNER: &str = "owner";
const DEPOSITOR: &str = "alice";
const FAR_DEADLINE: i64 = 4_102_444_800;

#[derive(Parser)]
#[command(name = "range-vault")]
#[command(about = "Automated CLMM range vault demo CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted deposit / fee-accrual / rebalance / withdraw
    /// lifecycle
    Demo {
        /// Protocol fee in parts per million
        #[arg(long, default_value_t = 5_000)]
        protocol_fee: u128,

        /// Target range width in ticks
        #[arg(long, default_value_t = 1200)]
        width: i32,
    },
    /// Rebalance through a random price walk and summarize churn
    Walk {
        /// Number of price steps
        #[arg(short, long, default_value_t = 50)]
        steps: u32,

        /// Per-step log-price volatility
        #[arg(short, long, default_value_t = 0.01)]
        volatility: f64,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Target range width in ticks
        #[arg(long, default_value_t = 1200)]
        width: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo {
            protocol_fee,
            width,
        } => run_demo(protocol_fee, width).await,
        Commands::Walk {
            steps,
            volatility,
            seed,
            width,
        } => run_walk(steps, volatility, seed, width).await,
    }
}

async fn build_vault(
    venue: &Arc<SimulatedVenue>,
    protocol_fee: u128,
    width: i32,
) -> Result<RangeVault<SimulatedVenue, SimulatedVenue, SimulatedVenue>> {
    let vault = RangeVault::new(
        venue.clone(),
        venue.clone(),
        venue.clone(),
        VaultParams {
            owner: OWNER.to_string(),
            token0: "tokenA".to_string(),
            token1: "tokenB".to_string(),
            protocol_fee_num: protocol_fee,
            slippage_num: 10_000, // 1%
            desired_tick_range: width,
        },
    )
    .await?;
    Ok(vault)
}

async fn print_state(
    label: &str,
    vault: &RangeVault<SimulatedVenue, SimulatedVenue, SimulatedVenue>,
) -> Result<()> {
    let tick = vault.current_tick().await?;
    let total = vault.total_value(Asset::Quote).await?;
    let claim = match vault.claim_price(Asset::Quote).await {
        Ok(price) => price.to_string(),
        Err(VaultError::EmptySupply) => "-".to_string(),
        Err(err) => return Err(err.into()),
    };
    let reserves = vault.idle_reserves();
    println!(
        "{label:<24} | tick {tick:>7} | desired {:>18} | value {total:>12} | claim {claim:>12} | idle ({}, {})",
        vault.desired_range().to_string(),
        reserves.base,
        reserves.quote,
    );
    Ok(())
}

async fn run_demo(protocol_fee: u128, width: i32) -> Result<()> {
    let venue = Arc::new(SimulatedVenue::new(
        "tokenA", "tokenB", ONE_X64, 60, 3000,
    ));
    let mut vault = build_vault(&venue, protocol_fee, width).await?;

    println!("== range vault lifecycle demo ==");
    print_state("initialized", &vault).await?;

    let shares = vault
        .deposit(DEPOSITOR, 1_000_000_000, 1_000_000_000, 0, FAR_DEADLINE)
        .await?;
    println!("minted {shares} claims for the bootstrap deposit");
    print_state("after deposit", &vault).await?;

    let position_id = vault
        .position_id()
        .ok_or_else(|| anyhow::anyhow!("no position after deposit"))?;
    venue.accrue_fees(position_id, 2_000_000, 2_000_000).await?;
    vault.rebalance().await?;
    print_state("after fee harvest", &vault).await?;

    // Push the price out of range and repair.
    let moved = range_vault_domain::math::tick::sqrt_price_at_tick(width)?;
    venue.set_sqrt_price(moved).await;
    println!(
        "price moved to {} (tick {width})",
        sqrt_price_x64_to_price(moved)
    );
    println!("needs update: {}", vault.needs_update().await?);
    vault.rebalance().await?;
    print_state("after rebalance", &vault).await?;

    let payout = vault
        .withdraw(DEPOSITOR, shares / 2, Asset::Quote, 0, FAR_DEADLINE)
        .await?;
    println!("withdrew half the claims for {payout} of token1");
    print_state("after withdrawal", &vault).await?;

    Ok(())
}

async fn run_walk(steps: u32, volatility: f64, seed: u64, width: i32) -> Result<()> {
    let venue = Arc::new(SimulatedVenue::new(
        "tokenA", "tokenB", ONE_X64, 60, 3000,
    ));
    let mut vault = build_vault(&venue, 0, width).await?;
    vault
        .deposit(DEPOSITOR, 1_000_000_000, 1_000_000_000, 0, FAR_DEADLINE)
        .await?;
    let start_value = vault.total_value(Asset::Quote).await?;

    let mut rng = StdRng::seed_from_u64(seed);
    let step_noise = Normal::new(0.0, volatility)?;

    let mut rebalances = 0u32;
    let mut last_position = vault.position_id();

    println!("== random walk: {steps} steps, sigma {volatility} ==");
    println!(
        "{:<6} | {:>10} | {:>8} | {:>20} | {:>12}",
        "step", "price", "tick", "range", "value"
    );

    for step in 0..steps {
        // Log-normal price step applied to the sqrt price.
        let shock: f64 = step_noise.sample(&mut rng);
        let sqrt_price = venue.sqrt_price().await;
        let drifted = (sqrt_price as f64 * (shock / 2.0).exp()) as u128;
        let drifted = drifted.clamp(MIN_SQRT_PRICE_X64, MAX_SQRT_PRICE_X64);
        venue.set_sqrt_price(drifted).await;

        vault.rebalance().await?;
        if vault.position_id() != last_position {
            rebalances += 1;
            last_position = vault.position_id();
        }

        let tick = vault.current_tick().await?;
        let value = vault.total_value(Asset::Quote).await?;
        println!(
            "{step:<6} | {:>10.6} | {tick:>8} | {:>20} | {value:>12}",
            sqrt_price_x64_to_price(drifted),
            vault.desired_range().to_string(),
        );
    }

    let final_value = vault.total_value(Asset::Quote).await?;
    info!(rebalances, start_value, final_value, "walk finished");
    println!("position re-mints: {rebalances}");
    println!("value: {start_value} -> {final_value}");
    Ok(())
}
