//! Proxy shape detection.
//!
//! Detection runs an ordered catalog of strategies against a contract that
//! already showed an EIP-1967 implementation. Catalog order is the
//! precedence order: the admin slot outranks a working `owner()`, and a
//! catch-all custom entry closes the list so an implementation-bearing
//! contract never goes unclassified.

use crate::chain::ChainReader;
use crate::registry::ProxyMetadata;
use crate::slots::{self, EIP1967_ADMIN_SLOT, EIP1967_IMPLEMENTATION_SLOT, OWNER_ACCESSOR};
use alloy::primitives::Address;
use async_trait::async_trait;

#[async_trait]
pub trait DetectStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns metadata when the strategy recognizes the contract. A failed
    /// read is a non-match, never an error.
    async fn detect(
        &self,
        reader: &dyn ChainReader,
        contract: Address,
        implementation: Address,
    ) -> Option<ProxyMetadata>;
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// An address in the EIP-1967 admin slot marks a transparent proxy.
struct AdminSlotStrategy;

#[async_trait]
impl DetectStrategy for AdminSlotStrategy {
    fn name(&self) -> &'static str {
        "admin-slot"
    }

    async fn detect(
        &self,
        reader: &dyn ChainReader,
        contract: Address,
        implementation: Address,
    ) -> Option<ProxyMetadata> {
        let admin = slots::probe_slot_address(reader, contract, EIP1967_ADMIN_SLOT).await?;
        Some(ProxyMetadata::Transparent {
            implementation,
            admin,
        })
    }
}

/// A non-reverting `owner()` marks a UUPS proxy. The zero address is a
/// legitimate owner here; only a failed call is a non-match.
struct OwnerAccessorStrategy;

#[async_trait]
impl DetectStrategy for OwnerAccessorStrategy {
    fn name(&self) -> &'static str {
        "owner-accessor"
    }

    async fn detect(
        &self,
        reader: &dyn ChainReader,
        contract: Address,
        implementation: Address,
    ) -> Option<ProxyMetadata> {
        match reader.call_address_accessor(contract, OWNER_ACCESSOR).await {
            Ok(owner) => Some(ProxyMetadata::Uups {
                implementation,
                owner,
            }),
            Err(err) => {
                tracing::debug!("[CLASSIFY] owner() probe on {contract} failed: {err}");
                None
            }
        }
    }
}

/// Always matches: an implementation with no recognizable admin surface is
/// recorded as a custom proxy.
struct CustomFallbackStrategy;

#[async_trait]
impl DetectStrategy for CustomFallbackStrategy {
    fn name(&self) -> &'static str {
        "custom-fallback"
    }

    async fn detect(
        &self,
        _reader: &dyn ChainReader,
        _contract: Address,
        implementation: Address,
    ) -> Option<ProxyMetadata> {
        Some(ProxyMetadata::Custom { implementation })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The detection catalog in precedence order.
pub fn strategies() -> Vec<Box<dyn DetectStrategy>> {
    vec![
        Box::new(AdminSlotStrategy),
        Box::new(OwnerAccessorStrategy),
        Box::new(CustomFallbackStrategy),
    ]
}

/// Classifies a live contract: `None` when it shows no EIP-1967
/// implementation, otherwise the first matching strategy's verdict.
///
/// Total by construction. Read failures degrade to an absent implementation
/// so one unreachable node cannot abort a whole sweep; whether that laxity
/// is acceptable is the caller's concern (the verifier re-reads strictly).
pub async fn classify(reader: &dyn ChainReader, contract: Address) -> Option<ProxyMetadata> {
    let implementation =
        slots::probe_slot_address(reader, contract, EIP1967_IMPLEMENTATION_SLOT).await?;
    for strategy in strategies() {
        if let Some(meta) = strategy.detect(reader, contract, implementation).await {
            tracing::debug!(
                "[CLASSIFY] {contract} matched strategy `{}`",
                strategy.name()
            );
            return Some(meta);
        }
    }
    None
}
