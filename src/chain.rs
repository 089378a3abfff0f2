//! Read-only chain access.
//!
//! Everything the engines learn from a chain flows through [`ChainReader`]:
//! raw storage words, contract code, and a single zero-argument accessor
//! call. The surface is kept this narrow so both engines can run against an
//! in-memory double in tests and so the per-record read count stays easy to
//! audit.

use crate::error::ChainAccessError;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;

pub type HttpProvider = RootProvider<Http<Client>>;

// ---------------------------------------------------------------------------
// Reader interface
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Raw 32-byte storage read. Unset slots come back as the zero word,
    /// never as an error.
    async fn storage_word(&self, contract: Address, slot: B256)
        -> Result<B256, ChainAccessError>;

    /// `eth_call` of a zero-argument accessor that returns a single address,
    /// e.g. `owner()`. Reverts and short return data are errors.
    async fn call_address_accessor(
        &self,
        contract: Address,
        signature: &str,
    ) -> Result<Address, ChainAccessError>;

    /// Deployed bytecode at the latest block.
    async fn code(&self, contract: Address) -> Result<Bytes, ChainAccessError>;
}

// ---------------------------------------------------------------------------
// Production implementation
// ---------------------------------------------------------------------------

/// [`ChainReader`] over an alloy HTTP provider. One instance per chain; no
/// retry or timeout layer, failures surface directly in the error taxonomy.
#[derive(Debug)]
pub struct RpcChainReader {
    provider: HttpProvider,
}

impl RpcChainReader {
    pub fn connect(rpc_url: &str) -> Result<Self, ChainAccessError> {
        let parsed = rpc_url.parse().map_err(|err| ChainAccessError::InvalidUrl {
            url: rpc_url.to_string(),
            reason: format!("{err}"),
        })?;
        Ok(Self {
            provider: ProviderBuilder::new().on_http(parsed),
        })
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn storage_word(
        &self,
        contract: Address,
        slot: B256,
    ) -> Result<B256, ChainAccessError> {
        let value = self
            .provider
            .get_storage_at(contract, U256::from_be_bytes(slot.0))
            .await
            .map_err(|err| ChainAccessError::Transport(err.to_string()))?;
        Ok(B256::from(value))
    }

    async fn call_address_accessor(
        &self,
        contract: Address,
        signature: &str,
    ) -> Result<Address, ChainAccessError> {
        let calldata = selector(signature).to_vec();
        let req = alloy::rpc::types::TransactionRequest::default()
            .to(contract)
            .input(alloy::rpc::types::TransactionInput::new(calldata.into()));
        let raw = self
            .provider
            .call(&req)
            .await
            .map_err(|err| ChainAccessError::CallFailed {
                function: signature.to_string(),
                contract: contract.to_string(),
                reason: err.to_string(),
            })?;
        decode_address_return(&raw, contract, signature)
    }

    async fn code(&self, contract: Address) -> Result<Bytes, ChainAccessError> {
        self.provider
            .get_code_at(contract)
            .await
            .map_err(|err| ChainAccessError::Transport(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// An ABI-encoded address return is one 32-byte word with the address in the
/// low 20 bytes. The zero address is a valid return value here, unlike in
/// slot decoding.
fn decode_address_return(
    raw: &[u8],
    contract: Address,
    signature: &str,
) -> Result<Address, ChainAccessError> {
    if raw.len() < 32 {
        return Err(ChainAccessError::ShortReturn {
            function: signature.to_string(),
            contract: contract.to_string(),
            got: raw.len(),
        });
    }
    Ok(Address::from_slice(&raw[12..32]))
}
