//! The on-disk registry model: one JSON file per chain.
//!
//! Each file is an ordered object holding a reserved scalar `chainId` entry
//! plus one deployment record per contract. Both engines treat these files
//! as the system of record, so the model round-trips byte-identically for
//! files this crate wrote: insertion order preserved, two-space indentation,
//! checksummed addresses, trailing newline.

use crate::error::RegistryError;
use alloy::primitives::Address;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Reserved key for the scalar chain-id entry; never a deployment record.
pub const CHAIN_ID_KEY: &str = "chainId";

// ---------------------------------------------------------------------------
// Proxy metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Transparent,
    Uups,
    Custom,
}

impl ProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::Transparent => "transparent",
            ProxyKind::Uups => "uups",
            ProxyKind::Custom => "custom",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "transparent" => Some(ProxyKind::Transparent),
            "uups" => Some(ProxyKind::Uups),
            "custom" => Some(ProxyKind::Custom),
            _ => None,
        }
    }
}

/// What the classifier concluded about a proxy, one variant per shape.
/// `implementation` is present in every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMetadata {
    Transparent { implementation: Address, admin: Address },
    Uups { implementation: Address, owner: Address },
    Custom { implementation: Address },
}

impl ProxyMetadata {
    pub fn implementation(&self) -> Address {
        match self {
            ProxyMetadata::Transparent { implementation, .. }
            | ProxyMetadata::Uups { implementation, .. }
            | ProxyMetadata::Custom { implementation } => *implementation,
        }
    }

    pub fn kind(&self) -> ProxyKind {
        match self {
            ProxyMetadata::Transparent { .. } => ProxyKind::Transparent,
            ProxyMetadata::Uups { .. } => ProxyKind::Uups,
            ProxyMetadata::Custom { .. } => ProxyKind::Custom,
        }
    }
}

/// Flat wire form of [`ProxyMetadata`]. Field order here is the field order
/// in the files. Registries written before the `type` tag existed carry
/// tag-less custom entries, so the tag stays optional on decode.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProxyWire {
    #[serde(with = "serde_checksum")]
    implementation: Address,
    #[serde(
        default,
        with = "serde_checksum_opt",
        skip_serializing_if = "Option::is_none"
    )]
    admin: Option<Address>,
    #[serde(
        default,
        with = "serde_checksum_opt",
        skip_serializing_if = "Option::is_none"
    )]
    owner: Option<Address>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl From<&ProxyMetadata> for ProxyWire {
    fn from(meta: &ProxyMetadata) -> Self {
        let (admin, owner) = match meta {
            ProxyMetadata::Transparent { admin, .. } => (Some(*admin), None),
            ProxyMetadata::Uups { owner, .. } => (None, Some(*owner)),
            ProxyMetadata::Custom { .. } => (None, None),
        };
        ProxyWire {
            implementation: meta.implementation(),
            admin,
            owner,
            kind: Some(meta.kind().as_str().to_string()),
        }
    }
}

impl TryFrom<ProxyWire> for ProxyMetadata {
    type Error = RegistryError;

    fn try_from(wire: ProxyWire) -> Result<Self, Self::Error> {
        let meta = match (wire.admin, wire.owner) {
            (Some(_), Some(_)) => {
                return Err(RegistryError::MalformedRecord(
                    "proxy metadata carries both admin and owner".to_string(),
                ))
            }
            (Some(admin), None) => ProxyMetadata::Transparent {
                implementation: wire.implementation,
                admin,
            },
            (None, Some(owner)) => ProxyMetadata::Uups {
                implementation: wire.implementation,
                owner,
            },
            (None, None) => ProxyMetadata::Custom {
                implementation: wire.implementation,
            },
        };
        if let Some(raw) = wire.kind.as_deref() {
            match ProxyKind::parse(raw) {
                Some(kind) if kind == meta.kind() => {}
                Some(kind) => {
                    return Err(RegistryError::MalformedRecord(format!(
                        "proxy type tag `{}` disagrees with fields (expected `{}`)",
                        kind.as_str(),
                        meta.kind().as_str()
                    )))
                }
                None => {
                    return Err(RegistryError::MalformedRecord(format!(
                        "unknown proxy type tag `{raw}`"
                    )))
                }
            }
        }
        Ok(meta)
    }
}

/// In-memory classification state of a record. Only the `Proxy` state is
/// persisted; both other states round-trip to an absent `proxy` field, so a
/// reload always comes back `Unclassified`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyStatus {
    #[default]
    Unclassified,
    ConfirmedNonProxy,
    Proxy(ProxyMetadata),
}

impl ProxyStatus {
    pub fn metadata(&self) -> Option<&ProxyMetadata> {
        match self {
            ProxyStatus::Proxy(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn is_unrecorded(&self) -> bool {
        self.metadata().is_none()
    }
}

fn serialize_status<S>(status: &ProxyStatus, ser: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match status.metadata() {
        Some(meta) => ProxyWire::from(meta).serialize(ser),
        None => ser.serialize_none(),
    }
}

fn deserialize_status<'de, D>(de: D) -> Result<ProxyStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let wire = ProxyWire::deserialize(de)?;
    let meta = ProxyMetadata::try_from(wire).map_err(serde::de::Error::custom)?;
    Ok(ProxyStatus::Proxy(meta))
}

// ---------------------------------------------------------------------------
// Records and the per-chain registry
// ---------------------------------------------------------------------------

/// One deployed contract. Unknown fields are rejected on load: writes are
/// whole-file replacements, so an unmodeled key would be silently dropped on
/// the next save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentRecord {
    pub name: String,
    #[serde(with = "serde_checksum")]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<serde_json::Value>>,
    #[serde(
        default,
        serialize_with = "serialize_status",
        deserialize_with = "deserialize_status",
        skip_serializing_if = "ProxyStatus::is_unrecorded"
    )]
    pub proxy: ProxyStatus,
}

impl DeploymentRecord {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
            args: None,
            proxy: ProxyStatus::Unclassified,
        }
    }
}

/// Either the reserved scalar chain-id entry or a deployment record. Scalar
/// values do occasionally appear under other keys in hand-edited files; the
/// engines never treat those as records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryEntry {
    ChainId(u64),
    Record(DeploymentRecord),
}

/// The full contents of one chain's registry file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl ChainRegistry {
    /// A registry holding nothing but the scalar chain-id entry.
    pub fn fresh(chain_id: u64) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(CHAIN_ID_KEY.to_string(), RegistryEntry::ChainId(chain_id));
        Self { entries }
    }

    /// Loads a registry file. `Ok(None)` when the file does not exist;
    /// unreadable or unparseable files are errors the caller decides about.
    pub fn load(path: &Path) -> Result<Option<Self>, RegistryError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(RegistryError::Read {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                })
            }
        };
        let registry = serde_json::from_str(&raw).map_err(|err| RegistryError::Parse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(Some(registry))
    }

    /// Whole-file replacement write, creating the parent directory first.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let json = self.to_json_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| RegistryError::Write {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        }
        fs::write(path, json).map_err(|err| RegistryError::Write {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
    }

    /// The exact bytes [`ChainRegistry::save`] writes: two-space-indented
    /// JSON plus a trailing newline.
    pub fn to_json_string(&self) -> Result<String, RegistryError> {
        let mut json = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| RegistryError::Encode(err.to_string()))?;
        json.push('\n');
        Ok(json)
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self.entries.get(CHAIN_ID_KEY) {
            Some(RegistryEntry::ChainId(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn get_record(&self, key: &str) -> Option<&DeploymentRecord> {
        match self.entries.get(key) {
            Some(RegistryEntry::Record(record)) => Some(record),
            _ => None,
        }
    }

    pub fn get_record_mut(&mut self, key: &str) -> Option<&mut DeploymentRecord> {
        match self.entries.get_mut(key) {
            Some(RegistryEntry::Record(record)) => Some(record),
            _ => None,
        }
    }

    /// Inserts or replaces a record. An existing key keeps its position in
    /// the file; a new key appends at the end.
    pub fn set_record(&mut self, key: &str, record: DeploymentRecord) {
        self.entries
            .insert(key.to_string(), RegistryEntry::Record(record));
    }

    /// Every entry except the reserved chain-id one, in file order. Includes
    /// stray scalars, which the verifier flags and the reconciler skips.
    pub fn deployment_entries(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries
            .iter()
            .filter(|(key, _)| key.as_str() != CHAIN_ID_KEY)
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Deployment records only, in file order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &DeploymentRecord)> {
        self.deployment_entries().filter_map(|(key, entry)| match entry {
            RegistryEntry::Record(record) => Some((key, record)),
            RegistryEntry::ChainId(_) => None,
        })
    }

    pub fn record_count(&self) -> usize {
        self.records().count()
    }
}

// ---------------------------------------------------------------------------
// Address encoding
// ---------------------------------------------------------------------------

// Registry files store addresses in EIP-55 checksummed form. alloy's default
// address serialization is lowercase hex, so the wire structs go through
// these helpers instead.
pub(crate) mod serde_checksum {
    use alloy::primitives::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(addr: &Address, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&addr.to_checksum(None))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(de)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub(crate) mod serde_checksum_opt {
    use alloy::primitives::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(addr: &Option<Address>, ser: S) -> Result<S::Ok, S::Error> {
        match addr {
            Some(addr) => ser.serialize_str(&addr.to_checksum(None)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Address>, D::Error> {
        Option::<String>::deserialize(de)?
            .map(|raw| raw.parse().map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const SAMPLE: &str = r#"{
  "chainId": 10,
  "WCT": {
    "name": "WCT",
    "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
    "args": [
      "0x0000000000000000000000000000000000000001"
    ],
    "proxy": {
      "implementation": "0x6B175474E89094C44Da98b954EedeAC495271d0F",
      "admin": "0xdAC17F958D2ee523a2206206994597C13D831ec7",
      "type": "transparent"
    }
  },
  "Relay": {
    "name": "Relay",
    "address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
  }
}
"#;

    #[test]
    fn test_load_sample_shapes() {
        let registry: ChainRegistry = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(registry.chain_id(), Some(10));
        assert_eq!(registry.record_count(), 2);

        let wct = registry.get_record("WCT").unwrap();
        assert_eq!(wct.name, "WCT");
        assert_eq!(wct.args.as_ref().unwrap().len(), 1);
        let meta = wct.proxy.metadata().unwrap();
        assert_eq!(meta.kind(), ProxyKind::Transparent);
        assert_eq!(
            meta.implementation(),
            address!("6B175474E89094C44Da98b954EedeAC495271d0F")
        );

        let relay = registry.get_record("Relay").unwrap();
        assert_eq!(relay.proxy, ProxyStatus::Unclassified);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let registry: ChainRegistry = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(registry.to_json_string().unwrap(), SAMPLE);
    }

    #[test]
    fn test_addresses_reparse_in_any_case() {
        let lowered = SAMPLE.to_lowercase();
        let registry: ChainRegistry = serde_json::from_str(&lowered).unwrap();
        assert_eq!(
            registry.get_record("wct").unwrap().address,
            address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")
        );
    }

    #[test]
    fn test_tagless_custom_metadata_still_decodes() {
        let raw = r#"{"name": "Vault", "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                      "proxy": {"implementation": "0x6B175474E89094C44Da98b954EedeAC495271d0F"}}"#;
        let record: DeploymentRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.proxy.metadata().unwrap().kind(), ProxyKind::Custom);
    }

    #[test]
    fn test_custom_metadata_serializes_with_type_tag() {
        let mut record = DeploymentRecord::new(
            "Vault",
            address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
        );
        record.proxy = ProxyStatus::Proxy(ProxyMetadata::Custom {
            implementation: address!("6B175474E89094C44Da98b954EedeAC495271d0F"),
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""type":"custom""#));
        assert!(!json.contains("admin"));
        assert!(!json.contains("owner"));
    }

    #[test]
    fn test_metadata_with_admin_and_owner_is_rejected() {
        let raw = r#"{"name": "X", "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                      "proxy": {"implementation": "0x6B175474E89094C44Da98b954EedeAC495271d0F",
                                "admin": "0xdAC17F958D2ee523a2206206994597C13D831ec7",
                                "owner": "0xdAC17F958D2ee523a2206206994597C13D831ec7"}}"#;
        assert!(serde_json::from_str::<DeploymentRecord>(raw).is_err());
    }

    #[test]
    fn test_metadata_without_implementation_is_rejected() {
        let raw = r#"{"name": "X", "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                      "proxy": {"admin": "0xdAC17F958D2ee523a2206206994597C13D831ec7"}}"#;
        assert!(serde_json::from_str::<DeploymentRecord>(raw).is_err());
    }

    #[test]
    fn test_mismatched_type_tag_is_rejected() {
        let raw = r#"{"name": "X", "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                      "proxy": {"implementation": "0x6B175474E89094C44Da98b954EedeAC495271d0F",
                                "admin": "0xdAC17F958D2ee523a2206206994597C13D831ec7",
                                "type": "uups"}}"#;
        assert!(serde_json::from_str::<DeploymentRecord>(raw).is_err());
    }

    #[test]
    fn test_unknown_record_field_is_rejected() {
        let raw = r#"{"name": "X", "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                      "deployer": "0xdAC17F958D2ee523a2206206994597C13D831ec7"}"#;
        assert!(serde_json::from_str::<DeploymentRecord>(raw).is_err());
    }

    #[test]
    fn test_confirmed_non_proxy_persists_as_absent_field() {
        let mut record = DeploymentRecord::new(
            "Relay",
            address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        );
        record.proxy = ProxyStatus::ConfirmedNonProxy;
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("proxy"));

        let reloaded: DeploymentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.proxy, ProxyStatus::Unclassified);
    }

    #[test]
    fn test_addresses_serialize_checksummed() {
        let record = DeploymentRecord::new(
            "Relay",
            address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"));
    }

    #[test]
    fn test_set_record_keeps_position_and_appends_new_keys() {
        let mut registry: ChainRegistry = serde_json::from_str(SAMPLE).unwrap();
        registry.set_record(
            "WCT",
            DeploymentRecord::new("WCT v2", address!("0000000000000000000000000000000000000002")),
        );
        registry.set_record(
            "Pool",
            DeploymentRecord::new("Pool", address!("0000000000000000000000000000000000000003")),
        );
        let keys: Vec<&str> = registry.deployment_entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["WCT", "Relay", "Pool"]);
    }

    #[test]
    fn test_fresh_holds_only_the_chain_id() {
        let registry = ChainRegistry::fresh(8453);
        assert_eq!(registry.chain_id(), Some(8453));
        assert_eq!(registry.record_count(), 0);
        assert_eq!(
            registry.to_json_string().unwrap(),
            "{\n  \"chainId\": 8453\n}\n"
        );
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("999.json");
        assert!(ChainRegistry::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments").join("10.json");
        let registry: ChainRegistry = serde_json::from_str(SAMPLE).unwrap();
        registry.save(&path).unwrap();
        let reloaded = ChainRegistry::load(&path).unwrap().unwrap();
        assert_eq!(reloaded, registry);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_scalar_under_other_key_is_not_a_record() {
        let raw = "{\n  \"chainId\": 1,\n  \"NttManager\": 7\n}\n";
        let registry: ChainRegistry = serde_json::from_str(raw).unwrap();
        assert_eq!(registry.record_count(), 0);
        assert_eq!(registry.deployment_entries().count(), 1);
        assert_eq!(registry.to_json_string().unwrap(), raw);
    }
}
