use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use registry_warden::chain::ChainReader;
use registry_warden::error::ChainAccessError;
use registry_warden::slots::{EIP1967_ADMIN_SLOT, EIP1967_IMPLEMENTATION_SLOT};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory chain double for the engine flow tests. Contracts are "set up"
/// by seeding storage words, owners, and bytecode; per-contract failure
/// injection covers the unreachable-node paths.
#[derive(Default)]
pub struct MockChain {
    words: HashMap<(Address, B256), B256>,
    owners: HashMap<Address, Address>,
    bytecode: HashMap<Address, Bytes>,
    fail_storage: HashSet<Address>,
    fail_code: HashSet<Address>,
    storage_reads: AtomicUsize,
    accessor_calls: AtomicUsize,
}

/// An address stored the way EIP-1967 slots store one: right-aligned in a
/// 32-byte word.
pub fn word_for(addr: Address) -> B256 {
    let mut raw = [0u8; 32];
    raw[12..].copy_from_slice(addr.as_slice());
    B256::from(raw)
}

#[allow(dead_code)]
impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deploy(&mut self, contract: Address) {
        self.bytecode
            .insert(contract, Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]));
    }

    pub fn set_implementation(&mut self, proxy: Address, implementation: Address) {
        self.deploy(proxy);
        self.words
            .insert((proxy, EIP1967_IMPLEMENTATION_SLOT), word_for(implementation));
    }

    pub fn set_admin(&mut self, proxy: Address, admin: Address) {
        self.words.insert((proxy, EIP1967_ADMIN_SLOT), word_for(admin));
    }

    pub fn set_owner(&mut self, proxy: Address, owner: Address) {
        self.owners.insert(proxy, owner);
    }

    pub fn clear_implementation(&mut self, proxy: Address) {
        self.words.remove(&(proxy, EIP1967_IMPLEMENTATION_SLOT));
    }

    pub fn fail_storage_for(&mut self, contract: Address) {
        self.fail_storage.insert(contract);
    }

    pub fn fail_code_for(&mut self, contract: Address) {
        self.fail_code.insert(contract);
    }

    pub fn storage_read_count(&self) -> usize {
        self.storage_reads.load(Ordering::Relaxed)
    }

    pub fn accessor_call_count(&self) -> usize {
        self.accessor_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn storage_word(&self, contract: Address, slot: B256) -> Result<B256, ChainAccessError> {
        self.storage_reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_storage.contains(&contract) {
            return Err(ChainAccessError::Transport(
                "mock storage failure".to_string(),
            ));
        }
        Ok(self
            .words
            .get(&(contract, slot))
            .copied()
            .unwrap_or(B256::ZERO))
    }

    async fn call_address_accessor(
        &self,
        contract: Address,
        signature: &str,
    ) -> Result<Address, ChainAccessError> {
        self.accessor_calls.fetch_add(1, Ordering::Relaxed);
        self.owners
            .get(&contract)
            .copied()
            .ok_or_else(|| ChainAccessError::CallFailed {
                function: signature.to_string(),
                contract: contract.to_string(),
                reason: "execution reverted".to_string(),
            })
    }

    async fn code(&self, contract: Address) -> Result<Bytes, ChainAccessError> {
        if self.fail_code.contains(&contract) {
            return Err(ChainAccessError::Transport(
                "mock code fetch failure".to_string(),
            ));
        }
        Ok(self.bytecode.get(&contract).cloned().unwrap_or_default())
    }
}
