//! Mintgate node
//!
//! Entry point for running one admission-and-accounting instance and for
//! the operator tooling around whitelist roots and membership proofs.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

use lib_crypto::merkle::MerkleTree;
use lib_types::IdentityId;
use mintgate::{Instance, InstanceSpec};

#[derive(Parser, Debug)]
#[command(name = "mintgate")]
#[command(author, version, about = "Whitelist-gated mint admission and payment splitting service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter instance spec
    Init {
        /// Where to write the spec
        #[arg(short, long, default_value = "mintgate.spec.json")]
        output: PathBuf,
    },

    /// Run an instance service
    Run {
        /// Instance spec to build a fresh instance from
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Snapshot to restore instead of a fresh build
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Seconds between status log lines
        #[arg(long, default_value_t = 60)]
        status_interval: u64,
    },

    /// Compute the whitelist root over an identity file
    Root {
        /// File with one hex identity per line
        #[arg(short, long)]
        identities: PathBuf,
    },

    /// Emit the membership proof for one identity
    Prove {
        /// File with one hex identity per line
        #[arg(short, long)]
        identities: PathBuf,

        /// The identity to prove, hex encoded
        #[arg(long)]
        identity: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init { output } => init(&output),
        Commands::Run { spec, snapshot, status_interval } => {
            run(spec.as_deref(), snapshot.as_deref(), status_interval).await
        }
        Commands::Root { identities } => root(&identities),
        Commands::Prove { identities, identity } => prove(&identities, &identity),
    }
}

fn init(output: &Path) -> Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    InstanceSpec::example().save_to_file(output)?;
    info!("wrote starter spec to {}", output.display());
    Ok(())
}

async fn run(spec: Option<&Path>, snapshot: Option<&Path>, status_interval: u64) -> Result<()> {
    let instance = match (snapshot, spec) {
        (Some(snapshot_path), _) => {
            info!("restoring instance from {}", snapshot_path.display());
            Instance::load_from_file(snapshot_path)?
        }
        (None, Some(spec_path)) => {
            let spec = InstanceSpec::load_from_file(spec_path)?;
            Instance::from_spec(&spec)?
        }
        (None, None) => bail!("either --spec or --snapshot is required"),
    };

    let (handle, _task) = mintgate::spawn(instance);

    // Keep running, surfacing a status line on the configured cadence
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(status_interval));
    loop {
        ticker.tick().await;
        match handle.status().await {
            Ok(status) => info!(
                phase = %status.phase,
                issued = status.issued,
                supply_cap = status.supply_cap,
                balance = status.balance,
                height = status.height,
                "status"
            ),
            Err(_) => {
                info!("instance service stopped");
                return Ok(());
            }
        }
    }
}

fn read_identities(path: &Path) -> Result<Vec<IdentityId>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut identities = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let identity = IdentityId::from_hex(line)
            .with_context(|| format!("{}:{}", path.display(), number + 1))?;
        identities.push(identity);
    }
    if identities.is_empty() {
        bail!("{} contains no identities", path.display());
    }
    Ok(identities)
}

fn root(identities_path: &Path) -> Result<()> {
    let identities = read_identities(identities_path)?;
    let tree = MerkleTree::from_identities(&identities)?;
    println!("{}", tree.root());
    Ok(())
}

fn prove(identities_path: &Path, identity_hex: &str) -> Result<()> {
    let identities = read_identities(identities_path)?;
    let identity = IdentityId::from_hex(identity_hex).context("parsing --identity")?;
    let tree = MerkleTree::from_identities(&identities)?;
    let proof = tree
        .proof_for(&identity)
        .with_context(|| format!("{} is not in the membership set", identity))?;
    for sibling in proof.siblings() {
        println!("{}", hex::encode(sibling));
    }
    Ok(())
}
