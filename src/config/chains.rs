//! The chain table both engines are constructed from.
//!
//! Everything an engine needs per chain lives in one immutable [`ChainTable`]
//! built up front: chain id, display name, RPC endpoint, registry file path,
//! and the chain's key in the authority file when it has a bridge deployment.

use crate::error::{ConfigError, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DEPLOYMENTS_DIR: &str = "evm/deployments";
pub const DEFAULT_AUTHORITY_CONFIG: &str = "ntt/mainnet_deployment.json";

const MAINNET_PUBLIC_RPC: &str = "https://ethereum-rpc.publicnode.com";
const OPTIMISM_PUBLIC_RPC: &str = "https://optimism-rpc.publicnode.com";
const BASE_PUBLIC_RPC: &str = "https://base-rpc.publicnode.com";

#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub registry_path: PathBuf,
    /// Key into the authority file's `chains` map; `None` means the chain
    /// has no bridge deployment and its authority pass is a no-op.
    pub authority_name: Option<String>,
}

impl ChainEntry {
    fn mainnet(deployments_dir: &Path) -> Result<Self> {
        Self::build(
            1,
            "Ethereum Mainnet",
            MAINNET_PUBLIC_RPC,
            Some("Ethereum"),
            deployments_dir,
        )
    }

    fn optimism(deployments_dir: &Path) -> Result<Self> {
        Self::build(
            10,
            "OP Mainnet",
            OPTIMISM_PUBLIC_RPC,
            Some("Optimism"),
            deployments_dir,
        )
    }

    fn base(deployments_dir: &Path) -> Result<Self> {
        Self::build(8453, "Base", BASE_PUBLIC_RPC, None, deployments_dir)
    }

    fn build(
        chain_id: u64,
        name: &str,
        default_rpc: &str,
        authority_name: Option<&str>,
        deployments_dir: &Path,
    ) -> Result<Self> {
        let env_var = format!("ETH_RPC_URL_{chain_id}");
        let rpc_url = env::var(&env_var).unwrap_or_else(|_| default_rpc.to_string());
        validate_http_url(&env_var, &rpc_url)?;
        Ok(Self {
            chain_id,
            name: name.to_string(),
            rpc_url,
            registry_path: deployments_dir.join(format!("{chain_id}.json")),
            authority_name: authority_name.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChainTable {
    entries: Vec<ChainEntry>,
}

impl ChainTable {
    /// Builds the full table, applying `ETH_RPC_URL_<chain_id>` overrides.
    pub fn load(deployments_dir: &Path) -> Result<Self> {
        Ok(Self {
            entries: vec![
                ChainEntry::mainnet(deployments_dir)?,
                ChainEntry::optimism(deployments_dir)?,
                ChainEntry::base(deployments_dir)?,
            ],
        })
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Narrows the table to a single chain (the `--chain` flag).
    pub fn retain(&mut self, chain_id: u64) -> Result<()> {
        self.entries.retain(|entry| entry.chain_id == chain_id);
        if self.entries.is_empty() {
            return Err(ConfigError::InvalidConfig(format!(
                "chain {chain_id} is not in the chain table"
            ))
            .into());
        }
        Ok(())
    }
}

/// Deployments directory: flag value when given, else `DEPLOYMENTS_DIR`,
/// else the default.
pub fn resolve_deployments_dir(flag: Option<&str>) -> PathBuf {
    match flag {
        Some(dir) => PathBuf::from(dir),
        None => env::var("DEPLOYMENTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DEPLOYMENTS_DIR)),
    }
}

/// Authority config file: flag value when given, else
/// `AUTHORITY_CONFIG_FILE`, else the default.
pub fn resolve_authority_config(flag: Option<&str>) -> PathBuf {
    match flag {
        Some(path) => PathBuf::from(path),
        None => env::var("AUTHORITY_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_AUTHORITY_CONFIG)),
    }
}

fn validate_http_url(name: &str, raw: &str) -> Result<()> {
    let parsed = raw.parse::<reqwest::Url>().map_err(|e| {
        ConfigError::InvalidConfig(format!("{name} must be a valid URL, got `{raw}`: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidConfig(format!(
            "{name} must use http(s) scheme, got `{other}`"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_rpc_env() {
        for key in [
            "ETH_RPC_URL_1",
            "ETH_RPC_URL_10",
            "ETH_RPC_URL_8453",
            "DEPLOYMENTS_DIR",
            "AUTHORITY_CONFIG_FILE",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_table_covers_all_three_chains() {
        let _guard = env_lock().lock().expect("env lock");
        clear_rpc_env();
        let table = ChainTable::load(Path::new("evm/deployments")).unwrap();
        let ids: Vec<u64> = table.entries().iter().map(|e| e.chain_id).collect();
        assert_eq!(ids, vec![1, 10, 8453]);

        let mainnet = &table.entries()[0];
        assert_eq!(mainnet.name, "Ethereum Mainnet");
        assert_eq!(mainnet.authority_name.as_deref(), Some("Ethereum"));
        assert_eq!(
            mainnet.registry_path,
            PathBuf::from("evm/deployments/1.json")
        );

        let optimism = &table.entries()[1];
        assert_eq!(optimism.name, "OP Mainnet");
        assert_eq!(optimism.authority_name.as_deref(), Some("Optimism"));

        let base = &table.entries()[2];
        assert_eq!(base.name, "Base");
        assert_eq!(base.authority_name, None);
        clear_rpc_env();
    }

    #[test]
    fn test_env_var_overrides_rpc_url() {
        let _guard = env_lock().lock().expect("env lock");
        clear_rpc_env();
        std::env::set_var("ETH_RPC_URL_10", "http://localhost:9545");
        let table = ChainTable::load(Path::new("evm/deployments")).unwrap();
        assert_eq!(table.entries()[1].rpc_url, "http://localhost:9545");
        assert_eq!(table.entries()[0].rpc_url, MAINNET_PUBLIC_RPC);
        clear_rpc_env();
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let _guard = env_lock().lock().expect("env lock");
        clear_rpc_env();
        std::env::set_var("ETH_RPC_URL_1", "ws://localhost:8546");
        assert!(ChainTable::load(Path::new("evm/deployments")).is_err());
        clear_rpc_env();
    }

    #[test]
    fn test_retain_narrows_to_one_chain() {
        let _guard = env_lock().lock().expect("env lock");
        clear_rpc_env();
        let mut table = ChainTable::load(Path::new("d")).unwrap();
        table.retain(8453).unwrap();
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.entries()[0].chain_id, 8453);

        let mut table = ChainTable::load(Path::new("d")).unwrap();
        assert!(table.retain(42).is_err());
        clear_rpc_env();
    }

    #[test]
    fn test_path_resolution_precedence() {
        let _guard = env_lock().lock().expect("env lock");
        clear_rpc_env();
        assert_eq!(
            resolve_deployments_dir(None),
            PathBuf::from("evm/deployments")
        );
        assert_eq!(resolve_deployments_dir(Some("out")), PathBuf::from("out"));
        std::env::set_var("DEPLOYMENTS_DIR", "elsewhere");
        assert_eq!(resolve_deployments_dir(None), PathBuf::from("elsewhere"));
        assert_eq!(resolve_deployments_dir(Some("out")), PathBuf::from("out"));

        assert_eq!(
            resolve_authority_config(None),
            PathBuf::from("ntt/mainnet_deployment.json")
        );
        std::env::set_var("AUTHORITY_CONFIG_FILE", "ntt/testnet.json");
        assert_eq!(
            resolve_authority_config(None),
            PathBuf::from("ntt/testnet.json")
        );
        clear_rpc_env();
    }
}
