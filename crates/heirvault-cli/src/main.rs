//! HeirVault command line.
//!
//! Builds inheritance vault plans, verifies saved recovery kits, watches the
//! vault address through public Esplora explorers and relays signed
//! transactions.
//!
//! Usage:
//!   heirvault [--config <path>] <command> [args]
//!   heirvault --help

mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use heirvault_explorer::CancellationToken;
use serde::Serialize;

use crate::cli::Action;
use crate::config::CliConfig;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse(&args)?;

    match invocation.action {
        Action::Help => {
            print_help();
            return Ok(());
        }
        Action::Version => {
            println!("heirvault {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let mut config = CliConfig::load(invocation.config_path.as_deref())?;
    config.apply_env_overrides();
    config.validate().context("Configuration validation failed")?;

    if invocation.action == Action::Validate {
        println!("✓ Configuration is valid");
        println!("  Network:   {}", config.bitcoin.network);
        println!(
            "  Explorer:  {} (fallback {})",
            config.explorer.provider,
            if config.explorer.fallback { "on" } else { "off" }
        );
        println!("  Timeout:   {}s", config.explorer.timeout_secs);
        println!("  Check-in:  every {:.0}% of the locktime", config.checkin.cadence_ratio * 100.0);
        return Ok(());
    }

    // Initialize logging (stderr; stdout carries the JSON results)
    std::env::set_var("RUST_LOG", &config.general.log_level);
    env_logger::init();

    match invocation.action {
        Action::Plan { request, kit } => print_json(&commands::plan(&request, kit.as_deref())?),
        Action::Verify { kit } => print_json(&commands::verify(&kit)?),
        Action::CheckIn {
            locktime,
            confirmations,
        } => {
            let plan = commands::checkin(&config, locktime, confirmations);
            log::info!("{}", plan.summary());
            print_json(&plan)
        }
        Action::Combine { shares } => {
            let key = commands::combine(&shares)?;
            log::warn!("Import this key into a wallet and then clear your terminal history");
            println!("Beneficiary public key:  {}", key.pubkey);
            println!("Beneficiary secret key:  {}", key.secret_hex.as_str());
            Ok(())
        }
        Action::Status { address, locktime } => run_async(|cancel| async move {
            let report = commands::status(&config, &address, locktime, &cancel).await?;
            if let Some(plan) = &report.check_in {
                log::info!("{}", plan.summary());
            }
            print_json(&report)
        }),
        Action::Broadcast { tx_hex } => run_async(|cancel| async move {
            let result = commands::broadcast(&config, &tx_hex, &cancel).await?;
            print_json(&result)
        }),
        Action::Help | Action::Version | Action::Validate => Ok(()),
    }
}

/// Run network work on a fresh runtime; Ctrl-C cancels in-flight requests.
fn run_async<F, Fut>(f: F) -> Result<()>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling requests");
                on_signal.cancel();
            }
        });
        f(cancel).await
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_help() {
    println!(
        r#"heirvault {}
Bitcoin inheritance vaults: owner spends any time, beneficiary after a timelock

USAGE:
    heirvault [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
    plan <request.json> [--kit <out.json>]
                                  Build a vault plan; optionally save a recovery kit
    verify <kit.json>             Rebuild a recovery kit and check it still matches
    status <address> [--locktime <blocks>]
                                  Balance and latest funding of a vault address
    checkin --locktime <blocks> [--confirmations <n>]
                                  When the owner should next move the funds
    broadcast <hex | ->           Relay a signed transaction (- reads stdin)
    combine <share> <share>...    Rebuild the beneficiary key from trustee shares

OPTIONS:
    -c, --config <path>    Config file (default: ./heirvault.toml if present)
    -h, --help             Print this help
    -V, --version          Print version
    --validate             Validate config and exit

ENVIRONMENT VARIABLES:
    HEIRVAULT_LOG_LEVEL       Override general.log_level
    HEIRVAULT_NETWORK         Override bitcoin.network
    HEIRVAULT_PROVIDER        Override explorer.provider
    HEIRVAULT_FALLBACK        Override explorer.fallback
    HEIRVAULT_TIMEOUT_SECS    Override explorer.timeout_secs
    HEIRVAULT_CADENCE_RATIO   Override checkin.cadence_ratio

EXAMPLES:
    heirvault plan request.json --kit vault-kit.json
    heirvault verify vault-kit.json
    HEIRVAULT_NETWORK=testnet heirvault status tb1p... --locktime 26280
    heirvault checkin --locktime 26280 --confirmations 9000
"#,
        env!("CARGO_PKG_VERSION")
    );
}
