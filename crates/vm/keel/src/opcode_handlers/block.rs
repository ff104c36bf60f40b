use crate::{
    constants::LAST_AVAILABLE_BLOCK_LIMIT,
    errors::{OpcodeResult, VMError},
    revision::Revision,
    utils::{address_to_word, h256_to_word},
    vm::VM,
};
use ethereum_types::U256;

// Block Information (11)
// Opcodes: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, PREVRANDAO, GASLIMIT, CHAINID, SELFBALANCE, BASEFEE, BLOBHASH, BLOBBASEFEE

impl<'a> VM<'a> {
    pub fn op_blockhash(&mut self) -> Result<OpcodeResult, VMError> {
        let requested = self.current_call_frame.stack.pop1()?;
        let hash = match self.reachable_block(requested) {
            Some(number) => h256_to_word(self.host.get_block_hash(number)?),
            None => U256::zero(),
        };
        self.push_word(hash)
    }

    pub fn op_coinbase(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(address_to_word(self.env.tx.coinbase))
    }

    pub fn op_timestamp(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(U256::from(self.env.tx.timestamp))
    }

    pub fn op_number(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(U256::from(self.env.tx.block_number))
    }

    /// DIFFICULTY before Paris.
    pub fn op_prevrandao(&mut self) -> Result<OpcodeResult, VMError> {
        let value = if self.env.revision >= Revision::Paris {
            h256_to_word(self.env.tx.prev_randao)
        } else {
            self.env.tx.difficulty
        };
        self.push_word(value)
    }

    pub fn op_gaslimit(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(U256::from(self.env.tx.block_gas_limit))
    }

    pub fn op_chainid(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(self.env.tx.chain_id)
    }

    pub fn op_selfbalance(&mut self) -> Result<OpcodeResult, VMError> {
        let balance = self.host.get_balance(self.current_call_frame.to)?;
        self.push_word(balance)
    }

    pub fn op_basefee(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(self.env.tx.base_fee)
    }

    /// Zero for indexes past the transaction's blobs.
    pub fn op_blobhash(&mut self) -> Result<OpcodeResult, VMError> {
        let index = self.current_call_frame.stack.pop1()?;
        let blob_hash = usize::try_from(index)
            .ok()
            .and_then(|index| self.env.tx.blob_hashes.get(index))
            .map(|hash| h256_to_word(*hash))
            .unwrap_or_default();
        self.push_word(blob_hash)
    }

    pub fn op_blobbasefee(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(self.env.tx.blob_base_fee)
    }

    /// `requested` as a block number if it is one of the 256 most recent
    /// complete blocks.
    fn reachable_block(&self, requested: U256) -> Option<u64> {
        let current = self.env.tx.block_number;
        let oldest = current.saturating_sub(LAST_AVAILABLE_BLOCK_LIMIT);
        u64::try_from(requested)
            .ok()
            .filter(|number| (oldest..current).contains(number))
    }
}
