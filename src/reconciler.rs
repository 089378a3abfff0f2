//! Record reconciliation: brings registry files in line with live state.
//!
//! Two passes per chain, in a fixed order. The authority pass settles the
//! bridge records the authority file is the source of truth for, force
//! overwriting on any disagreement. The discovery pass then classifies every
//! remaining record exactly once and is write-once: metadata already on disk
//! is never replaced by discovery.

use crate::authority::{AuthorityChain, AuthorityConfig, AUTHORITY_RECORDS};
use crate::chain::{ChainReader, RpcChainReader};
use crate::classifier;
use crate::config::chains::ChainTable;
use crate::error::Result;
use crate::registry::{ChainRegistry, DeploymentRecord, ProxyMetadata, ProxyStatus};
use std::collections::HashSet;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Per-registry passes
// ---------------------------------------------------------------------------

/// Runs both passes over an in-memory registry and reports whether anything
/// changed. The chain's authority entry is `None` when the chain has no
/// bridge deployment or the authority file is absent; the authority pass is
/// skipped in that case.
pub async fn reconcile_registry(
    reader: &dyn ChainReader,
    registry: &mut ChainRegistry,
    authority: Option<&AuthorityChain>,
) -> bool {
    let (mut changed, touched) = match authority {
        Some(authority) => authority_pass(reader, registry, authority).await,
        None => (false, HashSet::new()),
    };
    if discovery_pass(reader, registry, &touched).await {
        changed = true;
    }
    changed
}

async fn authority_pass(
    reader: &dyn ChainReader,
    registry: &mut ChainRegistry,
    authority: &AuthorityChain,
) -> (bool, HashSet<&'static str>) {
    let mut changed = false;
    let mut touched = HashSet::new();
    for spec in &AUTHORITY_RECORDS {
        let expected = (spec.expected)(authority);
        // A missing entry, a stray scalar, or a different address all count
        // as drift from the authority config. A record that already agrees
        // is left alone and stays eligible for discovery.
        let agrees = matches!(
            registry.get_record(spec.key),
            Some(record) if record.address == expected
        );
        if agrees {
            tracing::debug!("[SYNC] {} already records {expected}", spec.key);
            continue;
        }
        touched.insert(spec.key);
        tracing::info!(
            "[SYNC] {} disagrees with authority config, overwriting with {expected}",
            spec.key
        );
        let mut record = DeploymentRecord::new(spec.display_name, expected);
        record.proxy = match classifier::classify(reader, expected).await {
            Some(meta) => ProxyStatus::Proxy(meta),
            None => ProxyStatus::ConfirmedNonProxy,
        };
        registry.set_record(spec.key, record);
        changed = true;
    }
    (changed, touched)
}

async fn discovery_pass(
    reader: &dyn ChainReader,
    registry: &mut ChainRegistry,
    touched: &HashSet<&'static str>,
) -> bool {
    let mut changed = false;
    let pending: Vec<String> = registry
        .records()
        .filter(|(key, record)| !touched.contains(*key) && record.proxy.is_unrecorded())
        .map(|(key, _)| key.to_string())
        .collect();

    for key in pending {
        let Some(record) = registry.get_record(&key) else {
            continue;
        };
        let address = record.address;
        let name = record.name.clone();
        match classifier::classify(reader, address).await {
            Some(meta) => {
                let detail = match &meta {
                    ProxyMetadata::Transparent { admin, .. } => format!(", admin {admin}"),
                    ProxyMetadata::Uups { owner, .. } => format!(", owner {owner}"),
                    ProxyMetadata::Custom { .. } => String::new(),
                };
                tracing::info!(
                    "[SYNC] {name} at {address} is a {} proxy (implementation {}{detail})",
                    meta.kind().as_str(),
                    meta.implementation()
                );
                if let Some(record) = registry.get_record_mut(&key) {
                    record.proxy = ProxyStatus::Proxy(meta);
                    changed = true;
                }
            }
            None => {
                tracing::debug!("[SYNC] {name} at {address} is not a proxy");
                if let Some(record) = registry.get_record_mut(&key) {
                    record.proxy = ProxyStatus::ConfirmedNonProxy;
                }
            }
        }
    }
    changed
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ChainRunOutcome {
    pub chain_id: u64,
    pub name: String,
    pub changed: bool,
    pub records: usize,
}

#[derive(Debug)]
pub struct RunSummary {
    pub chains: Vec<ChainRunOutcome>,
}

impl RunSummary {
    pub fn changed_count(&self) -> usize {
        self.chains.iter().filter(|c| c.changed).count()
    }
}

pub struct ReconcileEngine {
    table: ChainTable,
    authority_path: PathBuf,
}

impl ReconcileEngine {
    pub fn new(table: ChainTable, authority_path: PathBuf) -> Self {
        Self {
            table,
            authority_path,
        }
    }

    /// Reconciles every configured chain in table order, one at a time.
    /// Registry files are written back only when something changed. Write
    /// and connection failures are fatal; a missing or unreadable registry file
    /// is not (the chain starts from a fresh registry).
    pub async fn run(&self) -> Result<RunSummary> {
        let authority_config = AuthorityConfig::load(&self.authority_path);
        let mut chains = Vec::new();

        for entry in self.table.entries() {
            tracing::info!("[SYNC] reconciling {} (chain {})", entry.name, entry.chain_id);
            let reader = RpcChainReader::connect(&entry.rpc_url)?;

            let mut registry = match ChainRegistry::load(&entry.registry_path) {
                Ok(Some(registry)) => registry,
                Ok(None) => {
                    tracing::info!(
                        "[SYNC] no registry at {}, starting fresh",
                        entry.registry_path.display()
                    );
                    ChainRegistry::fresh(entry.chain_id)
                }
                Err(err) => {
                    tracing::warn!(
                        "[SYNC] could not load {}: {err}; starting fresh",
                        entry.registry_path.display()
                    );
                    ChainRegistry::fresh(entry.chain_id)
                }
            };

            let authority = match entry.authority_name.as_deref() {
                Some(name) => {
                    let found = authority_config.as_ref().and_then(|c| c.chain(name));
                    if found.is_none() {
                        tracing::debug!("[SYNC] no authority entry for {name}");
                    }
                    found
                }
                None => None,
            };

            let changed = reconcile_registry(&reader, &mut registry, authority).await;
            if changed {
                registry.save(&entry.registry_path)?;
                tracing::info!("[SYNC] wrote {}", entry.registry_path.display());
            } else {
                tracing::info!("[SYNC] {} unchanged", entry.registry_path.display());
            }

            chains.push(ChainRunOutcome {
                chain_id: entry.chain_id,
                name: entry.name.clone(),
                changed,
                records: registry.record_count(),
            });
        }

        Ok(RunSummary { chains })
    }
}
