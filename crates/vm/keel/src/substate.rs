use crate::{errors::InternalError, host::TxContext, revision::Revision};
use ethereum_types::{Address, U256};
use rustc_hash::{FxHashMap, FxHashSet};
use std::mem;

/// Bookkeeping of a call tree that the engine owns itself: warm accounts and
/// slots, transient storage, created and self-destructed accounts and the
/// refund counter.
///
/// It is organised as a chain of checkpoints. Every frame pushes one on entry
/// and commits or reverts it on exit, in lockstep with the host snapshot.
/// Fields are only ever added to, which is what makes the chain work.
#[derive(Debug, Default)]
pub struct Substate {
    parent: Option<Box<Self>>,
    selfdestruct_set: FxHashSet<Address>,
    accessed_addresses: FxHashSet<Address>,
    accessed_storage_slots: FxHashMap<Address, FxHashSet<U256>>,
    created_accounts: FxHashSet<Address>,
    /// Signed: net metered SSTORE can take back refunds granted earlier.
    refunded_gas: i64,
    transient_storage: FxHashMap<(Address, U256), U256>,
}

impl Substate {
    pub fn from_accesses(
        accessed_addresses: FxHashSet<Address>,
        accessed_storage_slots: FxHashMap<Address, FxHashSet<U256>>,
    ) -> Self {
        Self {
            accessed_addresses,
            accessed_storage_slots,
            ..Default::default()
        }
    }

    /// Substate of a fresh call tree with the accounts and slots that start
    /// warm (EIP-2929, EIP-2930, EIP-3651). The executing account and the
    /// sender are warmed by the engine when the first frame is entered.
    pub fn initialize(
        revision: Revision,
        tx: &TxContext,
        precompiles: impl IntoIterator<Item = Address>,
    ) -> Self {
        let mut accessed_addresses = FxHashSet::default();
        let mut accessed_storage_slots: FxHashMap<Address, FxHashSet<U256>> =
            FxHashMap::default();

        accessed_addresses.insert(tx.origin);

        if revision >= Revision::Shanghai {
            accessed_addresses.insert(tx.coinbase);
        }

        accessed_addresses.extend(precompiles);

        for entry in &tx.access_list {
            accessed_addresses.insert(entry.address);
            // The same address may appear in several entries.
            let warm_slots = accessed_storage_slots.entry(entry.address).or_default();
            warm_slots.extend(
                entry
                    .storage_keys
                    .iter()
                    .map(|key| U256::from_big_endian(key.as_bytes())),
            );
        }

        Self::from_accesses(accessed_addresses, accessed_storage_slots)
    }

    /// Push a checkpoint that can be either reverted or committed. All data up
    /// to this point is still accessible.
    pub fn push_backup(&mut self) {
        let parent = mem::take(self);
        self.refunded_gas = parent.refunded_gas;
        self.parent = Some(Box::new(parent));
    }

    /// Pop the last checkpoint and merge it with its parent.
    pub fn commit_backup(&mut self) -> Result<(), InternalError> {
        let parent = self
            .parent
            .as_mut()
            .ok_or(InternalError::MissingCheckpoint)?;
        let mut delta = mem::take(parent.as_mut());
        mem::swap(self, &mut delta);

        self.selfdestruct_set.extend(delta.selfdestruct_set);
        self.accessed_addresses.extend(delta.accessed_addresses);
        for (address, slot_set) in delta.accessed_storage_slots {
            self.accessed_storage_slots
                .entry(address)
                .or_default()
                .extend(slot_set);
        }
        self.created_accounts.extend(delta.created_accounts);
        self.refunded_gas = delta.refunded_gas;
        self.transient_storage.extend(delta.transient_storage);

        Ok(())
    }

    /// Discard everything since the last checkpoint.
    pub fn revert_backup(&mut self) -> Result<(), InternalError> {
        let parent = self
            .parent
            .as_mut()
            .ok_or(InternalError::MissingCheckpoint)?;
        *self = mem::take(parent.as_mut());
        Ok(())
    }

    pub fn refunded_gas(&self) -> i64 {
        self.refunded_gas
    }

    /// Adds `amount` to the refund counter. `amount` may be negative.
    pub fn refund(&mut self, amount: i64) {
        self.refunded_gas = self.refunded_gas.saturating_add(amount);
    }

    /// Whether `check` holds for this checkpoint or any of its ancestors.
    fn any_checkpoint(&self, check: impl Fn(&Self) -> bool) -> bool {
        let mut current = Some(self);
        while let Some(substate) = current {
            if check(substate) {
                return true;
            }
            current = substate.parent.as_deref();
        }
        false
    }

    /// Records a self-destruct. Returns whether the address was already
    /// recorded.
    pub fn add_selfdestruct(&mut self, address: Address) -> bool {
        if self.is_selfdestruct(&address) {
            return true;
        }
        self.selfdestruct_set.insert(address);
        false
    }

    pub fn is_selfdestruct(&self, address: &Address) -> bool {
        self.any_checkpoint(|substate| substate.selfdestruct_set.contains(address))
    }

    /// Warms a storage slot. Returns whether it was warm already.
    pub fn add_accessed_slot(&mut self, address: Address, key: U256) -> bool {
        if self.is_slot_accessed(&address, &key) {
            return true;
        }
        self.accessed_storage_slots
            .entry(address)
            .or_default()
            .insert(key);
        false
    }

    pub fn is_slot_accessed(&self, address: &Address, key: &U256) -> bool {
        self.any_checkpoint(|substate| {
            substate
                .accessed_storage_slots
                .get(address)
                .is_some_and(|slots| slots.contains(key))
        })
    }

    /// Warms an account. Returns whether it was warm already.
    pub fn add_accessed_address(&mut self, address: Address) -> bool {
        if self.is_address_accessed(&address) {
            return true;
        }
        self.accessed_addresses.insert(address);
        false
    }

    pub fn is_address_accessed(&self, address: &Address) -> bool {
        self.any_checkpoint(|substate| substate.accessed_addresses.contains(address))
    }

    /// Records an account created by this call tree. Only such accounts are
    /// deleted by SELFDESTRUCT from Cancun (EIP-6780).
    pub fn add_created_account(&mut self, address: Address) {
        self.created_accounts.insert(address);
    }

    pub fn is_account_created(&self, address: &Address) -> bool {
        self.any_checkpoint(|substate| substate.created_accounts.contains(address))
    }

    /// Value of a transient storage entry, or zero if never written.
    pub fn get_transient(&self, to: &Address, key: &U256) -> U256 {
        self.transient_storage
            .get(&(*to, *key))
            .copied()
            .unwrap_or_else(|| {
                self.parent
                    .as_ref()
                    .map(|parent| parent.get_transient(to, key))
                    .unwrap_or_default()
            })
    }

    pub fn set_transient(&mut self, to: &Address, key: &U256, value: U256) {
        self.transient_storage.insert((*to, *key), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::AccessListEntry;
    use ethereum_types::H256;

    fn address(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn reverted_checkpoint_forgets_accesses() {
        let mut substate = Substate::default();
        assert!(!substate.add_accessed_address(address(1)));

        substate.push_backup();
        assert!(substate.add_accessed_address(address(1)));
        assert!(!substate.add_accessed_address(address(2)));
        assert!(!substate.add_accessed_slot(address(2), U256::one()));
        substate.revert_backup().unwrap();

        assert!(substate.is_address_accessed(&address(1)));
        assert!(!substate.is_address_accessed(&address(2)));
        assert!(!substate.is_slot_accessed(&address(2), &U256::one()));
    }

    #[test]
    fn committed_checkpoint_keeps_everything() {
        let mut substate = Substate::default();
        substate.push_backup();
        substate.push_backup();
        substate.add_accessed_slot(address(3), U256::from(7));
        substate.set_transient(&address(3), &U256::one(), U256::from(9));
        substate.add_created_account(address(4));
        substate.refund(100);
        substate.commit_backup().unwrap();

        assert!(substate.is_slot_accessed(&address(3), &U256::from(7)));
        assert_eq!(
            substate.get_transient(&address(3), &U256::one()),
            U256::from(9)
        );
        assert!(substate.is_account_created(&address(4)));
        assert_eq!(substate.refunded_gas(), 100);

        substate.revert_backup().unwrap();
        assert_eq!(substate.refunded_gas(), 0);
        assert!(!substate.is_account_created(&address(4)));
        assert_eq!(
            substate.commit_backup(),
            Err(InternalError::MissingCheckpoint)
        );
    }

    #[test]
    fn refund_counter_can_go_down() {
        let mut substate = Substate::default();
        substate.refund(4800);
        substate.push_backup();
        substate.refund(-4800);
        assert_eq!(substate.refunded_gas(), 0);
        substate.revert_backup().unwrap();
        assert_eq!(substate.refunded_gas(), 4800);
    }

    #[test]
    fn transient_storage_reads_through_checkpoints() {
        let mut substate = Substate::default();
        let key = U256::from(5);
        substate.set_transient(&address(1), &key, U256::from(1));
        substate.push_backup();
        assert_eq!(substate.get_transient(&address(1), &key), U256::from(1));
        substate.set_transient(&address(1), &key, U256::from(2));
        assert_eq!(substate.get_transient(&address(1), &key), U256::from(2));
        substate.revert_backup().unwrap();
        assert_eq!(substate.get_transient(&address(1), &key), U256::from(1));
        assert_eq!(substate.get_transient(&address(2), &key), U256::zero());
    }

    #[test]
    fn initial_warm_set() {
        let tx = TxContext {
            origin: address(0xaa),
            coinbase: address(0xcc),
            access_list: vec![AccessListEntry {
                address: address(0xdd),
                storage_keys: vec![H256::from_low_u64_be(3)],
            }],
            ..Default::default()
        };
        let precompile = Address::from_low_u64_be(1);

        let london = Substate::initialize(Revision::London, &tx, [precompile]);
        assert!(london.is_address_accessed(&address(0xaa)));
        assert!(!london.is_address_accessed(&address(0xcc)));
        assert!(london.is_address_accessed(&precompile));
        assert!(london.is_slot_accessed(&address(0xdd), &U256::from(3)));

        let shanghai = Substate::initialize(Revision::Shanghai, &tx, []);
        assert!(shanghai.is_address_accessed(&address(0xcc)));
    }
}
