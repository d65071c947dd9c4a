//! beacon-deployer
//!
//! Provisions the random beacon contract set onto a fresh development chain
//! and prints the resulting address book as JSON.
//!
//! Usage:
//!   beacon-deployer provision [--params <json>] [--artifacts <dir>] [--operator <name>]
//!                             [--accounts <n>] [--start <rfc3339>] [--out <path>]
//!   beacon-deployer plan      [--staking]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use beacon_core::chain::Chain;
use beacon_core::types::Address;
use beacon_devnet::{builtin_artifacts, Devnet, DevnetConfig};
use beacon_provision::{
    bootstrap_all, AddressBook, ArtifactStore, BootstrapArtifacts, Plan, ProvisionParams,
};

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "beacon-deployer",
    version,
    about = "Provision the random beacon contracts onto a development chain"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy and wire the full system, then trigger genesis.
    Provision {
        /// Provisioning parameters (JSON). Development defaults if omitted.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Directory of compiled contract artifacts. Built-in set if omitted.
        #[arg(long)]
        artifacts: Option<PathBuf>,

        /// Operator artifact to deploy.
        #[arg(long, default_value = "KeepRandomBeaconOperator")]
        operator: String,

        /// Number of pre-funded accounts on the chain.
        #[arg(long, default_value_t = 10)]
        accounts: usize,

        /// Chain start time (RFC 3339). Defaults to now.
        #[arg(long)]
        start: Option<String>,

        /// Also write the summary JSON to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the step order a provisioning run follows.
    Plan {
        /// Only the staking phase.
        #[arg(long, default_value_t = false)]
        staking: bool,
    },
}

/// What a provisioning run reports.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Summary {
    network_id: u64,
    deployer: Address,
    started_at: DateTime<Utc>,
    operator: Address,
    service: Address,
    genesis_fee: String,
    addresses: AddressBook,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Provision {
            params,
            artifacts,
            operator,
            accounts,
            start,
            out,
        } => {
            cmd_provision(
                params.as_deref(),
                artifacts.as_deref(),
                operator,
                accounts,
                start.as_deref(),
                out.as_deref(),
            )
            .await
        }
        Command::Plan { staking } => cmd_plan(staking),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn cmd_provision(
    params: Option<&Path>,
    artifacts: Option<&Path>,
    operator: String,
    accounts: usize,
    start: Option<&str>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    if accounts == 0 {
        bail!("--accounts must be at least 1");
    }
    let params = load_params(params)?;
    let store = match artifacts {
        Some(dir) => ArtifactStore::load_dir(dir)
            .with_context(|| format!("loading artifacts from {}", dir.display()))?,
        None => ArtifactStore::from_artifacts(
            builtin_artifacts().context("building built-in artifacts")?,
        ),
    };
    let started_at = match start {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("parsing --start {s}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let start_timestamp = u64::try_from(started_at.timestamp())
        .context("--start must not be before 1970-01-01")?;

    let devnet = Devnet::new(DevnetConfig {
        accounts,
        start_timestamp,
        ..DevnetConfig::default()
    });
    let deployer = devnet.signer(0).context("selecting deployer account")?;
    let network_id = devnet.network_id().await?;
    info!(network_id, deployer = %deployer, "provisioning");

    let roles = BootstrapArtifacts::default().with_operator(operator);
    let system = bootstrap_all(&devnet, &deployer, &store, &roles, &params)
        .await
        .context("provisioning the random beacon")?;

    let summary = Summary {
        network_id,
        deployer: deployer.address,
        started_at,
        operator: system.operator.address,
        service: system.service.address,
        genesis_fee: devnet.balance(&system.operator.address).await?.to_string(),
        addresses: system.addresses,
    };
    let json = serde_json::to_string_pretty(&summary).context("serializing summary")?;
    if let Some(path) = out {
        std::fs::write(path, &json)
            .with_context(|| format!("writing summary to {}", path.display()))?;
        info!(path = %path.display(), "summary written");
    }
    println!("{json}");
    Ok(())
}

fn cmd_plan(staking: bool) -> anyhow::Result<()> {
    let plan = if staking { Plan::staking() } else { Plan::standard() };
    let order = plan.topological_order().context("ordering plan")?;
    for external in plan.externals() {
        println!("    {external} (external)");
    }
    for (i, id) in order.iter().enumerate() {
        let deps: Vec<&str> = id.dependencies().iter().map(|d| d.name()).collect();
        if deps.is_empty() {
            println!("{:>3}. {id}", i + 1);
        } else {
            println!("{:>3}. {id} <- {}", i + 1, deps.join(", "));
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_params(path: Option<&Path>) -> anyhow::Result<ProvisionParams> {
    match path {
        Some(p) => ProvisionParams::load(p)
            .with_context(|| format!("reading provisioning params from {}", p.display())),
        None => {
            warn!("No --params provided. Using development defaults.");
            Ok(ProvisionParams::default())
        }
    }
}
