//! EIP-1967 storage slot constants and address decoding.
//!
//! Both engines funnel every slot read through this module so the decoding
//! rule lives in exactly one place. The classifier wants lenient reads (an
//! unreachable node must not abort a sweep) while the verifier wants strict
//! ones, so the module exposes both entry points over the same bit-level
//! decode.

use crate::chain::ChainReader;
use crate::error::ChainAccessError;
use alloy::primitives::{b256, Address, B256};

/// EIP-1967 implementation storage slot (`keccak256("eip1967.proxy.implementation") - 1`).
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// EIP-1967 admin storage slot (`keccak256("eip1967.proxy.admin") - 1`).
pub const EIP1967_ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// The zero-argument accessor probed for UUPS-style ownership.
pub const OWNER_ACCESSOR: &str = "owner()";

/// Decodes an address from the low 160 bits of a raw storage word.
///
/// The all-zero word marks an unset slot and decodes to `None`. That is the
/// only absence rule: any other word decodes to an address, even one whose
/// low 160 bits happen to be zero.
pub fn address_from_word(word: B256) -> Option<Address> {
    if word == B256::ZERO {
        return None;
    }
    Some(Address::from_slice(&word[12..]))
}

/// Strict slot read: transport failures propagate to the caller.
pub async fn read_slot_address(
    reader: &dyn ChainReader,
    contract: Address,
    slot: B256,
) -> std::result::Result<Option<Address>, ChainAccessError> {
    let word = reader.storage_word(contract, slot).await?;
    Ok(address_from_word(word))
}

/// Lenient slot read: a failed read is reported as an absent value.
pub async fn probe_slot_address(
    reader: &dyn ChainReader,
    contract: Address,
    slot: B256,
) -> Option<Address> {
    match reader.storage_word(contract, slot).await {
        Ok(word) => address_from_word(word),
        Err(err) => {
            tracing::debug!("[SLOTS] read of {slot} on {contract} failed, treating as unset: {err}");
            None
        }
    }
}
