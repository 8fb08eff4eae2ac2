//! Instance configuration
//!
//! An `InstanceSpec` is the JSON document an operator writes to stand up
//! one instance: identity of the authority, pricing, caps, the payee
//! table, and governance parameters. Validation mirrors a standard
//! deployment: the platform wallet is always the first payee with exactly
//! 500 of the 10 000 total shares.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use lib_governance::EngineConfig;
use lib_types::{Amount, Bps, IdentityId, RootHash, ShareWeight, TickHeight};

/// Share weight always held by the platform wallet
pub const PLATFORM_SHARES: ShareWeight = 500;

/// Required grand total of all share weights
pub const TOTAL_SHARES: ShareWeight = 10_000;

/// One creator payee entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeSpec {
    pub identity: IdentityId,
    pub shares: ShareWeight,
}

/// Governance timing and threshold parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Ticks between proposal creation and voting opening
    pub voting_delay: TickHeight,

    /// Length of the voting window in ticks
    pub voting_period: TickHeight,

    /// Minimum snapshot weight required to propose
    pub proposal_threshold: u64,

    /// Quorum in basis points of snapshot total voting weight
    pub quorum_bps: Bps,

    /// Optional timelock between success and execution
    pub timelock_delay: Option<TickHeight>,

    /// Ticks past the eta a queued proposal stays executable
    pub execution_grace: TickHeight,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            voting_delay: engine.voting_delay,
            voting_period: engine.voting_period,
            proposal_threshold: engine.proposal_threshold,
            quorum_bps: engine.quorum_bps,
            timelock_delay: engine.timelock_delay,
            execution_grace: engine.execution_grace,
        }
    }
}

impl GovernanceParams {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            voting_delay: self.voting_delay,
            voting_period: self.voting_period,
            proposal_threshold: self.proposal_threshold,
            quorum_bps: self.quorum_bps,
            timelock_delay: self.timelock_delay,
            execution_grace: self.execution_grace,
        }
    }
}

fn default_mint_cap() -> u64 {
    1
}

/// Complete configuration for one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Display label for the drop
    pub label: String,

    /// Opaque metadata location handed to downstream consumers
    pub metadata_uri: String,

    /// The controlling authority
    pub authority: IdentityId,

    /// Platform wallet; always the first payee with [`PLATFORM_SHARES`]
    pub platform_wallet: IdentityId,

    /// Price of one slot in atomic units
    pub unit_price: Amount,

    /// Hard cap on issued slots
    pub supply_cap: u64,

    /// Maximum slots per mint request
    #[serde(default = "default_mint_cap")]
    pub per_transaction_cap: u64,

    /// Maximum whitelist claims per identity
    #[serde(default = "default_mint_cap")]
    pub per_identity_whitelist_cap: u64,

    /// Optional initial membership root
    #[serde(default)]
    pub whitelist_root: Option<RootHash>,

    /// Creator payees; their shares plus the platform's must total
    /// [`TOTAL_SHARES`]
    pub payees: Vec<PayeeSpec>,

    /// Governance parameters
    #[serde(default)]
    pub governance: GovernanceParams,
}

impl InstanceSpec {
    /// Validate the spec before an instance is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.label.is_empty() {
            bail!("label must not be empty");
        }
        if self.authority.is_zero() {
            bail!("authority must not be the zero identity");
        }
        if self.platform_wallet.is_zero() {
            bail!("platform wallet must not be the zero identity");
        }
        if self.supply_cap == 0 {
            bail!("supply cap must be at least 1");
        }
        if self.payees.is_empty() {
            bail!("at least one creator payee is required");
        }

        let mut seen = vec![self.platform_wallet];
        let mut creator_shares: ShareWeight = 0;
        for payee in &self.payees {
            if payee.identity.is_zero() {
                bail!("payee identity must not be the zero identity");
            }
            if seen.contains(&payee.identity) {
                bail!("duplicate payee {}", payee.identity);
            }
            if payee.shares == 0 {
                bail!("payee {} has zero shares", payee.identity);
            }
            seen.push(payee.identity);
            creator_shares = creator_shares
                .checked_add(payee.shares)
                .context("share weights overflow")?;
        }

        let total = creator_shares
            .checked_add(PLATFORM_SHARES)
            .context("share weights overflow")?;
        if total != TOTAL_SHARES {
            bail!(
                "share weights must total {} (platform {} + creators {}), got {}",
                TOTAL_SHARES,
                PLATFORM_SHARES,
                TOTAL_SHARES - PLATFORM_SHARES,
                total
            );
        }
        Ok(())
    }

    /// The splitter payee table: platform wallet first, creators after
    pub fn payee_table(&self) -> Vec<(IdentityId, ShareWeight)> {
        let mut table = vec![(self.platform_wallet, PLATFORM_SHARES)];
        table.extend(self.payees.iter().map(|p| (p.identity, p.shares)));
        table
    }

    /// Load a spec from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening spec {}", path.display()))?;
        let spec: InstanceSpec =
            serde_json::from_reader(file).with_context(|| format!("parsing spec {}", path.display()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Write a spec to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating spec {}", path.display()))?;
        serde_json::to_writer_pretty(file, self).context("encoding spec")?;
        Ok(())
    }

    /// A starter spec for `mintgate init`
    pub fn example() -> Self {
        Self {
            label: "example-drop".to_string(),
            metadata_uri: "storage/placeholder.json".to_string(),
            authority: IdentityId::new([0x11; 32]),
            platform_wallet: IdentityId::new([0x22; 32]),
            unit_price: 1_000_000_000,
            supply_cap: 10_000,
            per_transaction_cap: 1,
            per_identity_whitelist_cap: 1,
            whitelist_root: None,
            payees: vec![
                PayeeSpec {
                    identity: IdentityId::new([0x11; 32]),
                    shares: 5_000,
                },
                PayeeSpec {
                    identity: IdentityId::new([0x33; 32]),
                    shares: 4_500,
                },
            ],
            governance: GovernanceParams::default(),
        }
    }
}
