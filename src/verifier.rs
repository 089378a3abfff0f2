//! Drift verification: re-reads live state and checks the registry's claims.
//!
//! Documented state is verified with strict reads: any failure, including a
//! failed read, is a hard failure. Undocumented state gets one lenient probe
//! whose only possible output is a warning. Consistency failures are data,
//! not errors: they accumulate into the report and surface in the exit code
//! after every chain has been checked.

use crate::chain::{ChainReader, RpcChainReader};
use crate::config::chains::ChainTable;
use crate::error::Result;
use crate::registry::{ChainRegistry, ProxyMetadata, RegistryEntry};
use crate::slots::{self, EIP1967_ADMIN_SLOT, EIP1967_IMPLEMENTATION_SLOT, OWNER_ACCESSOR};

/// Human labels for well-known registry keys, used in log lines and the
/// failure list. Unknown keys fall back to the key itself.
const CONTRACT_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("WCT", "WCT Token"),
    ("L2WCT", "L2WCT Token"),
    ("AdminTimelock", "Admin Timelock"),
    ("ManagerTimelock", "Manager Timelock"),
    ("NttManager", "NTT Manager"),
    ("NttTransceiver", "NTT Transceiver"),
    ("LockedTokenStakerBackers", "LockedTokenStaker Backers"),
    ("LockedTokenStakerReown", "LockedTokenStaker Reown"),
    (
        "LockedTokenStakerWalletConnect",
        "LockedTokenStaker WalletConnect",
    ),
    ("MerkleVesterBackers", "MerkleVester Backers"),
    ("MerkleVesterReown", "MerkleVester Reown"),
    ("MerkleVesterWalletConnect", "MerkleVester WalletConnect"),
    ("StakingRewardsCalculator", "StakingRewardCalculator"),
];

pub fn display_label(key: &str) -> &str {
    CONTRACT_DISPLAY_NAMES
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, label)| *label)
        .unwrap_or(key)
}

// ---------------------------------------------------------------------------
// Per-record checks
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RecordOutcome {
    pub key: String,
    pub label: String,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl RecordOutcome {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            label: display_label(key).to_string(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Checks one registry entry against live state. Checks run in order and
/// stop at the first hard failure, so an outcome carries at most one.
pub async fn verify_record(
    reader: &dyn ChainReader,
    key: &str,
    entry: &RegistryEntry,
) -> RecordOutcome {
    let mut outcome = RecordOutcome::new(key);

    let record = match entry {
        RegistryEntry::Record(record) => record,
        RegistryEntry::ChainId(value) => {
            outcome
                .failures
                .push(format!("entry holds the scalar {value}, not a deployment record"));
            report_outcome(&outcome);
            return outcome;
        }
    };
    let address = record.address;
    tracing::info!("[VERIFY] checking {} at {address}", outcome.label);

    match reader.code(address).await {
        Ok(code) if code.is_empty() => {
            outcome
                .failures
                .push(format!("no contract code at {address}"));
            report_outcome(&outcome);
            return outcome;
        }
        Err(err) => {
            outcome
                .failures
                .push(format!("could not fetch code at {address}: {err}"));
            report_outcome(&outcome);
            return outcome;
        }
        Ok(_) => {}
    }

    match record.proxy.metadata() {
        Some(meta) => verify_documented_proxy(reader, address, meta, &mut outcome).await,
        None => {
            // Warning-only probe; a read failure here stays silent.
            if let Some(live) =
                slots::probe_slot_address(reader, address, EIP1967_IMPLEMENTATION_SLOT).await
            {
                outcome.warnings.push(format!(
                    "marked non-proxy but the implementation slot holds {live}"
                ));
            }
        }
    }

    report_outcome(&outcome);
    outcome
}

async fn verify_documented_proxy(
    reader: &dyn ChainReader,
    address: alloy::primitives::Address,
    meta: &ProxyMetadata,
    outcome: &mut RecordOutcome,
) {
    let live_impl =
        match slots::read_slot_address(reader, address, EIP1967_IMPLEMENTATION_SLOT).await {
            Ok(Some(live)) => live,
            Ok(None) => {
                outcome.failures.push(
                    "documented as a proxy but the implementation slot is empty".to_string(),
                );
                return;
            }
            Err(err) => {
                outcome
                    .failures
                    .push(format!("implementation slot read failed: {err}"));
                return;
            }
        };
    if live_impl != meta.implementation() {
        outcome.failures.push(format!(
            "implementation drift: registry has {}, chain has {live_impl}",
            meta.implementation()
        ));
        return;
    }

    match meta {
        ProxyMetadata::Transparent { admin, .. } => {
            match slots::read_slot_address(reader, address, EIP1967_ADMIN_SLOT).await {
                Ok(Some(live)) if live == *admin => {}
                Ok(Some(live)) => outcome.failures.push(format!(
                    "admin drift: registry has {admin}, chain has {live}"
                )),
                Ok(None) => outcome
                    .failures
                    .push("documented as transparent but the admin slot is empty".to_string()),
                Err(err) => outcome
                    .failures
                    .push(format!("admin slot read failed: {err}")),
            }
        }
        ProxyMetadata::Uups { owner, .. } => {
            match reader.call_address_accessor(address, OWNER_ACCESSOR).await {
                Ok(live) if live == *owner => {}
                Ok(live) => outcome.failures.push(format!(
                    "owner drift: registry has {owner}, chain has {live}"
                )),
                Err(err) => outcome.failures.push(format!("owner() call failed: {err}")),
            }
        }
        ProxyMetadata::Custom { .. } => {}
    }
}

fn report_outcome(outcome: &RecordOutcome) {
    for warning in &outcome.warnings {
        tracing::warn!("[VERIFY] {}: {warning}", outcome.label);
    }
    if let Some(failure) = outcome.failures.first() {
        tracing::warn!("[VERIFY] {}: {failure}", outcome.label);
    }
}

// ---------------------------------------------------------------------------
// Per-chain and run drivers
// ---------------------------------------------------------------------------

/// Checks every non-reserved entry of a registry, in file order.
pub async fn verify_registry(
    reader: &dyn ChainReader,
    registry: &ChainRegistry,
) -> Vec<RecordOutcome> {
    let mut outcomes = Vec::new();
    for (key, entry) in registry.deployment_entries() {
        outcomes.push(verify_record(reader, key, entry).await);
    }
    outcomes
}

#[derive(Debug)]
pub struct ChainReport {
    pub chain_id: u64,
    pub name: String,
    /// Set when there was nothing to verify against (missing or unreadable
    /// registry file). A structural failure fails the chain outright.
    pub structural_failure: Option<String>,
    pub outcomes: Vec<RecordOutcome>,
}

impl ChainReport {
    pub fn passed(&self) -> bool {
        self.structural_failure.is_none() && self.outcomes.iter().all(RecordOutcome::passed)
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed_labels(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.passed())
            .map(|o| o.label.as_str())
            .collect()
    }
}

#[derive(Debug)]
pub struct VerifySummary {
    pub chains: Vec<ChainReport>,
}

impl VerifySummary {
    pub fn all_passed(&self) -> bool {
        self.chains.iter().all(ChainReport::passed)
    }
}

pub struct VerifyEngine {
    table: ChainTable,
}

impl VerifyEngine {
    pub fn new(table: ChainTable) -> Self {
        Self { table }
    }

    /// Verifies every configured chain in table order. A chain with no
    /// loadable registry file is recorded as failed and the run moves on;
    /// nothing short of an invalid RPC URL aborts the whole run.
    pub async fn run(&self) -> Result<VerifySummary> {
        let mut chains = Vec::new();

        for entry in self.table.entries() {
            tracing::info!(
                "[VERIFY] verifying {} (chain {})",
                entry.name,
                entry.chain_id
            );
            let reader = RpcChainReader::connect(&entry.rpc_url)?;

            let report = match ChainRegistry::load(&entry.registry_path) {
                Ok(Some(registry)) => {
                    let outcomes = verify_registry(&reader, &registry).await;
                    ChainReport {
                        chain_id: entry.chain_id,
                        name: entry.name.clone(),
                        structural_failure: None,
                        outcomes,
                    }
                }
                Ok(None) => {
                    tracing::warn!(
                        "[VERIFY] registry file {} is missing",
                        entry.registry_path.display()
                    );
                    ChainReport {
                        chain_id: entry.chain_id,
                        name: entry.name.clone(),
                        structural_failure: Some(format!(
                            "registry file {} is missing",
                            entry.registry_path.display()
                        )),
                        outcomes: Vec::new(),
                    }
                }
                Err(err) => {
                    tracing::warn!("[VERIFY] {err}");
                    ChainReport {
                        chain_id: entry.chain_id,
                        name: entry.name.clone(),
                        structural_failure: Some(err.to_string()),
                        outcomes: Vec::new(),
                    }
                }
            };

            tracing::info!(
                "[VERIFY] {}: {}/{} records verified",
                entry.name,
                report.passed_count(),
                report.outcomes.len()
            );
            chains.push(report);
        }

        Ok(VerifySummary { chains })
    }
}
