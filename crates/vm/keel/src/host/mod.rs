//! Contract between the engine and the ledger it executes against.
//!
//! The engine never touches state directly. Every read, write, log and
//! host-mediated call goes through [`Host`], one blocking request at a time.

pub mod in_memory;
pub mod precompiles;

use crate::{
    constants::EMPTY_CODE_HASH,
    errors::{ExecutionReport, HostError},
    message::Message,
    revision::Revision,
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

pub use in_memory::InMemoryHost;

/// Handle to a point in the host's journal.
pub type SnapshotId = usize;

/// Effect of a storage write relative to the slot's original value (at the
/// start of the transaction) and current value. `X`, `Y` and `Z` are distinct
/// nonzero values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageStatus {
    /// The write left the slot as it was, or changed an already dirty slot
    /// between nonzero values (`X -> Y -> Z`, `0 -> Y -> Z`).
    Assigned,
    /// `0 -> 0 -> Z`
    Added,
    /// `X -> X -> 0`
    Deleted,
    /// `X -> X -> Z`
    Modified,
    /// `X -> 0 -> Z`
    DeletedAdded,
    /// `X -> Y -> 0`
    ModifiedDeleted,
    /// `X -> 0 -> X`
    DeletedRestored,
    /// `0 -> Y -> 0`
    AddedDeleted,
    /// `X -> Y -> X`
    ModifiedRestored,
}

impl StorageStatus {
    /// Classifies a write of `new` over `current`, given the slot's `original`
    /// value.
    pub fn classify(original: U256, current: U256, new: U256) -> Self {
        if current == new {
            return StorageStatus::Assigned;
        }
        if original == current {
            return if original.is_zero() {
                StorageStatus::Added
            } else if new.is_zero() {
                StorageStatus::Deleted
            } else {
                StorageStatus::Modified
            };
        }
        // The slot is dirty.
        if original.is_zero() {
            return if new.is_zero() {
                StorageStatus::AddedDeleted
            } else {
                StorageStatus::Assigned
            };
        }
        if current.is_zero() {
            return if new == original {
                StorageStatus::DeletedRestored
            } else {
                StorageStatus::DeletedAdded
            };
        }
        if new.is_zero() {
            StorageStatus::ModifiedDeleted
        } else if new == original {
            StorageStatus::ModifiedRestored
        } else {
            StorageStatus::Assigned
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<H256>,
}

/// Block and transaction fields visible to executing code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub origin: Address,
    pub gas_price: U256,
    pub coinbase: Address,
    pub block_number: u64,
    pub timestamp: u64,
    pub block_gas_limit: u64,
    /// Returned by opcode 0x44 from Paris on.
    pub prev_randao: H256,
    /// Returned by opcode 0x44 before Paris.
    pub difficulty: U256,
    pub chain_id: U256,
    pub base_fee: U256,
    pub blob_hashes: Vec<H256>,
    pub blob_base_fee: U256,
    /// Addresses and slots that start warm (EIP-2930).
    pub access_list: Vec<AccessListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

/// Capability set of the ledger.
///
/// Implementations must provide snapshot/revert over everything they store:
/// the engine takes a snapshot when it enters a frame and reverts to it when
/// the frame does not succeed. A host shared between threads must serialize
/// access itself.
pub trait Host {
    /// Whether the account is present in state. From SpuriousDragon an empty
    /// account may be reported as absent.
    fn account_exists(&mut self, address: Address) -> Result<bool, HostError>;

    fn get_storage(&mut self, address: Address, key: U256) -> Result<U256, HostError>;

    /// Writes a slot and reports how the write relates to the slot's
    /// original and current values.
    fn set_storage(
        &mut self,
        address: Address,
        key: U256,
        value: U256,
    ) -> Result<StorageStatus, HostError>;

    fn get_balance(&mut self, address: Address) -> Result<U256, HostError>;

    fn get_nonce(&mut self, address: Address) -> Result<u64, HostError>;

    fn increment_nonce(&mut self, address: Address) -> Result<(), HostError>;

    /// Moves `value` between accounts, creating `to` if needed.
    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), HostError>;

    fn get_code(&mut self, address: Address) -> Result<Bytes, HostError>;

    fn get_code_size(&mut self, address: Address) -> Result<usize, HostError> {
        Ok(self.get_code(address)?.len())
    }

    /// Keccak-256 of the account's code, zero for accounts that do not exist.
    fn get_code_hash(&mut self, address: Address) -> Result<H256, HostError>;

    /// Copies code starting at `offset` into `buffer`, returning how many
    /// bytes were written.
    fn copy_code(
        &mut self,
        address: Address,
        offset: usize,
        buffer: &mut [u8],
    ) -> Result<usize, HostError> {
        let code = self.get_code(address)?;
        let available = code.get(offset..).unwrap_or_default();
        let copied = available.len().min(buffer.len());
        if let (Some(target), Some(source)) = (buffer.get_mut(..copied), available.get(..copied)) {
            target.copy_from_slice(source);
        }
        Ok(copied)
    }

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), HostError>;

    /// EIP-161 emptiness: no code, zero nonce and zero balance.
    fn is_empty(&mut self, address: Address) -> Result<bool, HostError> {
        let code_hash = self.get_code_hash(address)?;
        Ok(self.get_nonce(address)? == 0
            && self.get_balance(address)?.is_zero()
            && (code_hash == EMPTY_CODE_HASH || code_hash.is_zero()))
    }

    fn get_tx_context(&mut self) -> Result<TxContext, HostError>;

    /// Hash of block `number`. Only asked for the 256 most recent blocks.
    fn get_block_hash(&mut self, number: u64) -> Result<H256, HostError>;

    fn emit_log(&mut self, log: Log) -> Result<(), HostError>;

    /// Moves the whole balance of `address` to `beneficiary`. With `destroy`
    /// the account is also deleted when the transaction ends, and a balance
    /// sent to itself is burnt. The engine clears `destroy` from Cancun for
    /// accounts it did not create (EIP-6780).
    fn self_destruct(
        &mut self,
        address: Address,
        beneficiary: Address,
        destroy: bool,
    ) -> Result<(), HostError>;

    /// Whether calls to `address` are served by [`Host::call`] instead of
    /// bytecode.
    fn is_precompile(&self, address: &Address, revision: Revision) -> bool;

    /// Runs a host-mediated call, such as a precompile. Value has already
    /// been transferred by the engine.
    fn call(&mut self, message: &Message) -> Result<ExecutionReport, HostError>;

    fn snapshot(&mut self) -> SnapshotId;

    fn revert_to_snapshot(&mut self, snapshot: SnapshotId) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(original: u64, current: u64, new: u64) -> StorageStatus {
        StorageStatus::classify(original.into(), current.into(), new.into())
    }

    #[test]
    fn classifies_clean_slots() {
        assert_eq!(classify(0, 0, 0), StorageStatus::Assigned);
        assert_eq!(classify(0, 0, 1), StorageStatus::Added);
        assert_eq!(classify(1, 1, 0), StorageStatus::Deleted);
        assert_eq!(classify(1, 1, 2), StorageStatus::Modified);
        assert_eq!(classify(1, 1, 1), StorageStatus::Assigned);
    }

    #[test]
    fn classifies_dirty_slots() {
        assert_eq!(classify(1, 0, 2), StorageStatus::DeletedAdded);
        assert_eq!(classify(1, 2, 0), StorageStatus::ModifiedDeleted);
        assert_eq!(classify(1, 0, 1), StorageStatus::DeletedRestored);
        assert_eq!(classify(0, 2, 0), StorageStatus::AddedDeleted);
        assert_eq!(classify(1, 2, 1), StorageStatus::ModifiedRestored);
        assert_eq!(classify(1, 2, 3), StorageStatus::Assigned);
        assert_eq!(classify(0, 2, 3), StorageStatus::Assigned);
    }
}
