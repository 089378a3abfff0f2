//! Registry Warden library surface.
//!
//! Keeps file-based contract deployment registries consistent with live EVM
//! chain state. Two engines share this crate: the reconciler
//! (`src/bin/sync_deployments.rs`) classifies proxies and enforces the
//! bridge authority config, and the drift verifier
//! (`src/bin/verify_deployments.rs`) re-checks every documented claim
//! against the chain.

pub mod authority;
pub mod chain;
pub mod classifier;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod slots;
pub mod verifier;

pub mod config {
    pub mod chains;
}
