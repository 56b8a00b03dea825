use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleetsync::{ApiKey, ClientConfig, MaasClient, Manifest};
use fleetsync_core::api::ResourceApi;
use fleetsync_core::model::{Machine, ReleaseParams};
use fleetsync_core::{CancellationToken, Fleet, WaitTimings};
use tabled::{Table, Tabled};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fleetsync")]
#[command(about = "Converge a MAAS fleet to a declared manifest", long_about = None)]
struct Cli {
    /// MAAS URL, e.g. http://maas.local:5240/MAAS
    #[arg(long, env = "FLEETSYNC_API_URL")]
    api_url: Option<String>,

    /// API key (consumer:token:secret)
    #[arg(long, env = "FLEETSYNC_API_KEY", hide_env_values = true)]
    api_key: Option<ApiKey>,

    /// Seconds to wait for a deployment
    #[arg(long, default_value = "1200")]
    deploy_timeout: u64,

    /// Seconds to wait for commissioning
    #[arg(long, default_value = "1200")]
    commission_timeout: u64,

    /// Seconds to wait for a release
    #[arg(long, default_value = "600")]
    release_timeout: u64,

    /// Seconds before the first state poll
    #[arg(long, default_value = "5")]
    poll_delay: u64,

    /// Minimum seconds between state polls
    #[arg(long, default_value = "3")]
    poll_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a manifest without contacting the service
    Validate {
        /// Path to the manifest
        manifest: PathBuf,
    },

    /// Converge the fleet to a manifest
    Apply {
        /// Path to the manifest
        manifest: PathBuf,
    },

    /// Remove everything a manifest declares
    Destroy {
        /// Path to the manifest
        manifest: PathBuf,
    },

    /// List all machines
    Machines,

    /// Release a machine and wait until it is ready
    Release {
        /// System ID, hostname, FQDN or boot MAC address
        machine: String,

        /// Erase disks before releasing
        #[arg(long)]
        erase: bool,

        /// Comment recorded with the release
        #[arg(long)]
        comment: Option<String>,
    },
}

impl Cli {
    fn timings(&self) -> WaitTimings {
        WaitTimings {
            deploy: Duration::from_secs(self.deploy_timeout),
            commission: Duration::from_secs(self.commission_timeout),
            release: Duration::from_secs(self.release_timeout),
            delay: Duration::from_secs(self.poll_delay),
            min_interval: Duration::from_secs(self.poll_interval),
        }
    }

    fn connect(&self, cancel: CancellationToken) -> Result<Fleet<MaasClient>> {
        let api_url = self
            .api_url
            .as_deref()
            .context("--api-url or FLEETSYNC_API_URL is required")?;
        let api_key = self
            .api_key
            .clone()
            .context("--api-key or FLEETSYNC_API_KEY is required")?;

        let config = ClientConfig::new(api_url, api_key)?;
        info!(api = %config.api_root, "Using MAAS API");
        let client = MaasClient::new(config)?;

        Ok(Fleet::new(client)
            .with_cancellation(cancel)
            .with_timings(self.timings()))
    }
}

#[derive(Tabled)]
struct MachineRow {
    #[tabled(rename = "SYSTEM ID")]
    system_id: String,
    #[tabled(rename = "HOSTNAME")]
    hostname: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "POWER")]
    power: String,
    #[tabled(rename = "POOL")]
    pool: String,
    #[tabled(rename = "CPUS")]
    cpus: u32,
    #[tabled(rename = "MEMORY")]
    memory: String,
    #[tabled(rename = "TAGS")]
    tags: String,
}

fn or_dash(value: String) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value
    }
}

impl From<Machine> for MachineRow {
    fn from(machine: Machine) -> Self {
        let status = machine.status().to_string();
        Self {
            system_id: machine.system_id,
            hostname: or_dash(machine.hostname),
            status,
            power: or_dash(machine.power_state),
            pool: machine
                .pool
                .map(|pool| pool.name)
                .unwrap_or_else(|| "-".to_string()),
            cpus: machine.cpu_count,
            memory: format!("{} MiB", machine.memory),
            tags: or_dash(machine.tag_names.join(",")),
        }
    }
}

async fn load_manifest(path: &Path) -> Result<Manifest> {
    let manifest = Manifest::load(path).await?;
    manifest.validate()?;
    Ok(manifest)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetsync=info,fleetsync_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    match &cli.command {
        Commands::Validate { manifest } => {
            let manifest = load_manifest(manifest).await?;
            println!("Manifest is valid ({} objects)", manifest.len());
        }

        Commands::Apply { manifest } => {
            let manifest = load_manifest(manifest).await?;
            let fleet = cli.connect(cancel)?;
            let applied = manifest.apply(&fleet).await?;
            info!(applied, "Fleet converged");
        }

        Commands::Destroy { manifest } => {
            let manifest = load_manifest(manifest).await?;
            let fleet = cli.connect(cancel)?;
            let processed = manifest.destroy(&fleet).await?;
            info!(processed, "Fleet destroyed");
        }

        Commands::Machines => {
            let fleet = cli.connect(cancel)?;
            let machines = ResourceApi::<Machine>::list(fleet.api(), &())
                .await
                .context("failed to list machines")?;

            if machines.is_empty() {
                println!("No machines found");
            } else {
                let rows: Vec<MachineRow> = machines.into_iter().map(MachineRow::from).collect();
                let table = Table::new(rows);
                println!("{}", table);
            }
        }

        Commands::Release {
            machine,
            erase,
            comment,
        } => {
            let fleet = cli.connect(cancel)?;
            let params = ReleaseParams {
                erase: *erase,
                comment: comment.clone(),
                ..Default::default()
            };
            fleet.delete_instance(machine, &params).await?;
            println!("Released {}", machine);
        }
    }

    Ok(())
}
