//! Bridge authority configuration.
//!
//! One JSON file covers every chain's bridge deployment and outranks the
//! per-chain registries for the records named in [`AUTHORITY_RECORDS`]. The
//! engine only ever reads this file, so unmodeled keys are ignored rather
//! than rejected.

use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    chains: HashMap<String, AuthorityChain>,
}

/// One chain's slice of the authority file, keyed by the chain's authority
/// name (not always the display name; chain 10 is keyed "Optimism").
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityChain {
    pub manager: Address,
    pub transceivers: Transceivers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transceivers {
    pub wormhole: TransceiverEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransceiverEntry {
    pub address: Address,
}

impl AuthorityConfig {
    /// Loads the authority file. Absence or unreadability is not an error:
    /// the caller simply skips the authority pass.
    pub fn load(path: &Path) -> Option<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "[AUTHORITY] no config at {}, authority pass will be skipped",
                    path.display()
                );
                return None;
            }
            Err(err) => {
                tracing::warn!("[AUTHORITY] failed to read {}: {err}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("[AUTHORITY] failed to parse {}: {err}", path.display());
                None
            }
        }
    }

    pub fn chain(&self, authority_name: &str) -> Option<&AuthorityChain> {
        self.chains.get(authority_name)
    }
}

// ---------------------------------------------------------------------------
// Designated bridge records
// ---------------------------------------------------------------------------

/// A registry key the authority file is the source of truth for, with the
/// display name to write on overwrite and where in the chain's authority
/// entry the expected address lives.
pub struct AuthorityRecordSpec {
    pub key: &'static str,
    pub display_name: &'static str,
    pub expected: fn(&AuthorityChain) -> Address,
}

fn manager_address(chain: &AuthorityChain) -> Address {
    chain.manager
}

fn wormhole_transceiver_address(chain: &AuthorityChain) -> Address {
    chain.transceivers.wormhole.address
}

pub const AUTHORITY_RECORDS: [AuthorityRecordSpec; 2] = [
    AuthorityRecordSpec {
        key: "NttManager",
        display_name: "NTT Manager",
        expected: manager_address,
    },
    AuthorityRecordSpec {
        key: "NttTransceiver",
        display_name: "NTT Transceiver",
        expected: wormhole_transceiver_address,
    },
];
