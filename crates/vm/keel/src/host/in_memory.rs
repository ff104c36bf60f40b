//! Journaling in-memory ledger.
//!
//! Every mutation pushes an undo entry; a snapshot is the journal length at
//! the time it was taken. Serves the crate's tests and embedders that want a
//! starting point, not a persistence layer.

use super::{Host, Log, SnapshotId, StorageStatus, TxContext, precompiles};
use crate::{
    constants::EMPTY_CODE_HASH,
    errors::{ExecutionReport, ExecutionStatus, HostError},
    message::Message,
    revision::Revision,
    utils::keccak,
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub code_hash: H256,
    pub storage: FxHashMap<U256, U256>,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code: Bytes::new(),
            code_hash: EMPTY_CODE_HASH,
            storage: FxHashMap::default(),
        }
    }
}

impl Account {
    pub fn new(balance: U256, code: Bytes) -> Self {
        Self {
            balance,
            code_hash: keccak(&code),
            code,
            ..Default::default()
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_storage(mut self, key: U256, value: U256) -> Self {
        self.storage.insert(key, value);
        self
    }

    /// EIP-161
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }
}

#[derive(Debug, Clone)]
enum JournalEntry {
    AccountCreated(Address),
    BalanceChanged { address: Address, previous: U256 },
    NonceChanged { address: Address, previous: u64 },
    CodeChanged { address: Address, previous: Bytes, previous_hash: H256 },
    StorageChanged { address: Address, key: U256, previous: U256 },
    LogEmitted,
    MarkedDestructed(Address),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryHost {
    revision: Revision,
    accounts: FxHashMap<Address, Account>,
    /// Slot values at the start of the current transaction, captured on the
    /// first write.
    original_storage: FxHashMap<(Address, U256), U256>,
    block_hashes: FxHashMap<u64, H256>,
    tx_context: TxContext,
    logs: Vec<Log>,
    destructed: FxHashSet<Address>,
    journal: Vec<JournalEntry>,
    storage_writes: usize,
}

impl InMemoryHost {
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            ..Default::default()
        }
    }

    pub fn with_tx_context(mut self, tx_context: TxContext) -> Self {
        self.tx_context = tx_context;
        self
    }

    pub fn with_account(mut self, address: Address, account: Account) -> Self {
        self.accounts.insert(address, account);
        self
    }

    pub fn with_block_hash(mut self, number: u64, hash: H256) -> Self {
        self.block_hashes.insert(number, hash);
        self
    }

    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn storage(&self, address: &Address, key: U256) -> U256 {
        self.accounts
            .get(address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or_default()
    }

    pub fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn is_destructed(&self, address: &Address) -> bool {
        self.destructed.contains(address)
    }

    /// Number of `set_storage` requests served so far.
    pub fn storage_writes(&self) -> usize {
        self.storage_writes
    }

    /// Closes the current transaction: deletes self-destructed accounts and
    /// forgets original storage values, logs and the journal. Snapshots taken
    /// before are no longer valid.
    pub fn finalize_transaction(&mut self) {
        for address in self.destructed.drain() {
            self.accounts.remove(&address);
        }
        self.original_storage.clear();
        self.logs.clear();
        self.journal.clear();
    }

    fn account_mut(&mut self, address: Address) -> &mut Account {
        if !self.accounts.contains_key(&address) {
            self.journal.push(JournalEntry::AccountCreated(address));
        }
        self.accounts.entry(address).or_default()
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        let account = self.account_mut(address);
        let previous = std::mem::replace(&mut account.balance, balance);
        self.journal
            .push(JournalEntry::BalanceChanged { address, previous });
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated(address) => {
                self.accounts.remove(&address);
            }
            JournalEntry::BalanceChanged { address, previous } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = previous;
                }
            }
            JournalEntry::NonceChanged { address, previous } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.nonce = previous;
                }
            }
            JournalEntry::CodeChanged {
                address,
                previous,
                previous_hash,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.code = previous;
                    account.code_hash = previous_hash;
                }
            }
            JournalEntry::StorageChanged {
                address,
                key,
                previous,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    if previous.is_zero() {
                        account.storage.remove(&key);
                    } else {
                        account.storage.insert(key, previous);
                    }
                }
            }
            JournalEntry::LogEmitted => {
                self.logs.pop();
            }
            JournalEntry::MarkedDestructed(address) => {
                self.destructed.remove(&address);
            }
        }
    }

    fn run_precompile(&self, message: &Message) -> Result<ExecutionReport, HostError> {
        let code_address = message.code_address;
        let mut gas_remaining = u64::try_from(message.gas).unwrap_or_default();
        let result = precompiles::execute_precompile(
            &code_address,
            &message.input,
            &mut gas_remaining,
            self.revision,
        )
        .ok_or_else(|| HostError::Custom(format!("no precompile at {code_address:#x}")))?;

        let report = match result {
            Ok(output) => ExecutionReport {
                status: ExecutionStatus::Success,
                gas_left: i64::try_from(gas_remaining).unwrap_or_default(),
                gas_refund: 0,
                output,
                created_address: None,
            },
            Err(halt) => {
                trace!(address = ?code_address, ?halt, "Precompile failed");
                ExecutionReport::failure(halt)
            }
        };
        Ok(report)
    }
}

impl Host for InMemoryHost {
    fn account_exists(&mut self, address: Address) -> Result<bool, HostError> {
        Ok(self.accounts.contains_key(&address))
    }

    fn get_storage(&mut self, address: Address, key: U256) -> Result<U256, HostError> {
        Ok(self.storage(&address, key))
    }

    fn set_storage(
        &mut self,
        address: Address,
        key: U256,
        value: U256,
    ) -> Result<StorageStatus, HostError> {
        self.storage_writes = self.storage_writes.saturating_add(1);

        let current = self.storage(&address, key);
        let original = *self
            .original_storage
            .entry((address, key))
            .or_insert(current);
        let status = StorageStatus::classify(original, current, value);

        if current != value {
            let account = self.account_mut(address);
            if value.is_zero() {
                account.storage.remove(&key);
            } else {
                account.storage.insert(key, value);
            }
            self.journal.push(JournalEntry::StorageChanged {
                address,
                key,
                previous: current,
            });
        }

        Ok(status)
    }

    fn get_balance(&mut self, address: Address) -> Result<U256, HostError> {
        Ok(self.balance(&address))
    }

    fn get_nonce(&mut self, address: Address) -> Result<u64, HostError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.nonce)
            .unwrap_or_default())
    }

    fn increment_nonce(&mut self, address: Address) -> Result<(), HostError> {
        let account = self.account_mut(address);
        let previous = account.nonce;
        account.nonce = previous
            .checked_add(1)
            .ok_or(HostError::NonceOverflow(address))?;
        self.journal
            .push(JournalEntry::NonceChanged { address, previous });
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), HostError> {
        let from_balance = self.balance(&from);
        let remaining = from_balance
            .checked_sub(value)
            .ok_or(HostError::InsufficientFunds(from))?;
        if from == to {
            self.account_mut(to);
            return Ok(());
        }
        let to_balance = self
            .balance(&to)
            .checked_add(value)
            .ok_or_else(|| HostError::Custom(format!("balance of {to:#x} overflowed")))?;
        if !value.is_zero() {
            self.set_balance(from, remaining);
        }
        self.set_balance(to, to_balance);
        Ok(())
    }

    fn get_code(&mut self, address: Address) -> Result<Bytes, HostError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default())
    }

    fn get_code_hash(&mut self, address: Address) -> Result<H256, HostError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code_hash)
            .unwrap_or_default())
    }

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), HostError> {
        let code_hash = keccak(&code);
        let account = self.account_mut(address);
        let previous = std::mem::replace(&mut account.code, code);
        let previous_hash = std::mem::replace(&mut account.code_hash, code_hash);
        self.journal.push(JournalEntry::CodeChanged {
            address,
            previous,
            previous_hash,
        });
        Ok(())
    }

    fn is_empty(&mut self, address: Address) -> Result<bool, HostError> {
        Ok(self.accounts.get(&address).is_none_or(Account::is_empty))
    }

    fn get_tx_context(&mut self) -> Result<TxContext, HostError> {
        Ok(self.tx_context.clone())
    }

    fn get_block_hash(&mut self, number: u64) -> Result<H256, HostError> {
        Ok(self
            .block_hashes
            .get(&number)
            .copied()
            .unwrap_or_default())
    }

    fn emit_log(&mut self, log: Log) -> Result<(), HostError> {
        self.logs.push(log);
        self.journal.push(JournalEntry::LogEmitted);
        Ok(())
    }

    fn self_destruct(
        &mut self,
        address: Address,
        beneficiary: Address,
        destroy: bool,
    ) -> Result<(), HostError> {
        let balance = self.balance(&address);
        if address != beneficiary {
            self.transfer(address, beneficiary, balance)?;
        } else if destroy {
            self.set_balance(address, U256::zero());
        }

        if destroy && self.destructed.insert(address) {
            self.journal.push(JournalEntry::MarkedDestructed(address));
        }
        Ok(())
    }

    fn is_precompile(&self, address: &Address, revision: Revision) -> bool {
        precompiles::is_precompile(address, revision)
    }

    fn call(&mut self, message: &Message) -> Result<ExecutionReport, HostError> {
        self.run_precompile(message)
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.journal.len()
    }

    fn revert_to_snapshot(&mut self, snapshot: SnapshotId) -> Result<(), HostError> {
        if snapshot > self.journal.len() {
            return Err(HostError::UnknownSnapshot(snapshot));
        }
        trace!(
            snapshot,
            entries = self.journal.len().saturating_sub(snapshot),
            "Reverting host journal"
        );
        while self.journal.len() > snapshot {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        Ok(())
    }
}
