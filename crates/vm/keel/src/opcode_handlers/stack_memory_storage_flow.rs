use crate::{
    call_frame::CallFrame,
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{ExceptionalHalt, InternalError, OpcodeResult, VMError},
    gas_cost::{self, SSTORE_STIPEND},
    memory::{self, calculate_memory_size},
    utils::{size_offset_to_usize, u256_to_usize},
    vm::VM,
};
use ethereum_types::U256;

// Stack, Memory, Storage and Flow Operations (15)
// Opcodes: POP, MLOAD, MSTORE, MSTORE8, SLOAD, SSTORE, JUMP, JUMPI, PC, MSIZE, GAS, JUMPDEST, TLOAD, TSTORE, MCOPY

impl<'a> VM<'a> {
    // POP operation
    #[inline]
    pub fn op_pop(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.stack.pop1()?;

        Ok(OpcodeResult::Continue)
    }

    // TLOAD operation
    pub fn op_tload(&mut self) -> Result<OpcodeResult, VMError> {
        let key = self.current_call_frame.stack.pop1()?;
        let to = self.current_call_frame.to;
        let value = self.substate.get_transient(&to, &key);

        self.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    // TSTORE operation
    pub fn op_tstore(&mut self) -> Result<OpcodeResult, VMError> {
        let [key, value] = *self.current_call_frame.stack.pop()?;
        let to = self.current_call_frame.to;
        self.substate.set_transient(&to, &key, value);

        Ok(OpcodeResult::Continue)
    }

    // MLOAD operation
    pub fn op_mload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let offset = current_call_frame.stack.pop1()?;
        let (_, offset) = size_offset_to_usize(U256::from(WORD_SIZE_IN_BYTES_USIZE), offset)?;

        let new_memory_size = calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?;

        current_call_frame.increase_consumed_gas(memory::expansion_cost(
            new_memory_size,
            current_call_frame.memory.len(),
        )?)?;

        let value = current_call_frame.memory.load_word(offset)?;
        current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    // MSTORE operation
    pub fn op_mstore(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = *current_call_frame.stack.pop()?;
        let (_, offset) = size_offset_to_usize(U256::from(WORD_SIZE_IN_BYTES_USIZE), offset)?;

        let new_memory_size = calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?;

        current_call_frame.increase_consumed_gas(memory::expansion_cost(
            new_memory_size,
            current_call_frame.memory.len(),
        )?)?;

        current_call_frame.memory.store_word(offset, value)?;

        Ok(OpcodeResult::Continue)
    }

    // MSTORE8 operation
    pub fn op_mstore8(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = *current_call_frame.stack.pop()?;
        let (_, offset) = size_offset_to_usize(U256::one(), offset)?;

        let new_memory_size = calculate_memory_size(offset, 1)?;

        current_call_frame.increase_consumed_gas(memory::expansion_cost(
            new_memory_size,
            current_call_frame.memory.len(),
        )?)?;

        current_call_frame.memory.store_data(offset, &[value.byte(0)])?;

        Ok(OpcodeResult::Continue)
    }

    // SLOAD operation
    pub fn op_sload(&mut self) -> Result<OpcodeResult, VMError> {
        let key = self.current_call_frame.stack.pop1()?;
        let address = self.current_call_frame.to;

        let storage_slot_was_cold = !self.substate.add_accessed_slot(address, key);

        self.current_call_frame
            .increase_consumed_gas(gas_cost::cold_sload_surcharge(
                storage_slot_was_cold,
                self.env.revision,
            ))?;

        let value = self.host.get_storage(address, key)?;

        self.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    // SSTORE operation
    pub fn op_sstore(&mut self) -> Result<OpcodeResult, VMError> {
        let revision = self.env.revision;
        let [key, value] = *self.current_call_frame.stack.pop()?;
        let to = self.current_call_frame.to;

        // EIP-2200
        if gas_cost::is_net_metered(revision) {
            let gas_left = u64::try_from(self.current_call_frame.gas_remaining)
                .map_err(|_| ExceptionalHalt::OutOfGas)?;
            if gas_left <= SSTORE_STIPEND {
                return Err(ExceptionalHalt::OutOfGas.into());
            }
        }

        let storage_slot_was_cold = !self.substate.add_accessed_slot(to, key);

        // The price depends on how the write relates to earlier ones, which
        // only the host knows. A frame that cannot pay is reverted, write
        // included.
        let status = self.host.set_storage(to, key, value)?;

        self.current_call_frame
            .increase_consumed_gas(gas_cost::sstore(status, storage_slot_was_cold, revision))?;

        self.substate.refund(gas_cost::sstore_refund(status, revision));

        Ok(OpcodeResult::Continue)
    }

    // MSIZE operation
    pub fn op_msize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame
            .stack
            .push(U256::from(current_call_frame.memory.len()))?;

        Ok(OpcodeResult::Continue)
    }

    // GAS operation
    pub fn op_gas(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;

        let remaining_gas = current_call_frame.gas_remaining;
        current_call_frame
            .stack
            .push(U256::from(u64::try_from(remaining_gas).unwrap_or_default()))?;

        Ok(OpcodeResult::Continue)
    }

    // MCOPY operation
    pub fn op_mcopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, src_offset, size] = *current_call_frame.stack.pop()?;

        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let (_, src_offset) = size_offset_to_usize(U256::from(size), src_offset)?;

        let new_memory_size_for_dest = calculate_memory_size(dest_offset, size)?;
        let new_memory_size_for_src = calculate_memory_size(src_offset, size)?;
        let new_memory_size = new_memory_size_for_dest.max(new_memory_size_for_src);

        current_call_frame.increase_consumed_gas(gas_cost::copy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;

        current_call_frame
            .memory
            .copy_within(src_offset, dest_offset, size)?;

        Ok(OpcodeResult::Continue)
    }

    // JUMP operation
    pub fn op_jump(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let jump_address = current_call_frame.stack.pop1()?;
        Self::jump(current_call_frame, jump_address)?;

        Ok(OpcodeResult::Continue)
    }

    /// JUMP* family (`JUMP` and `JUMPI`) jump address validation and pc update.
    fn jump(call_frame: &mut CallFrame, jump_address: U256) -> Result<(), VMError> {
        let jump_address =
            u256_to_usize(jump_address).map_err(|_| ExceptionalHalt::InvalidJump)?;

        if !call_frame.bytecode.is_valid_jump_target(jump_address) {
            return Err(ExceptionalHalt::InvalidJump.into());
        }

        call_frame.pc = jump_address;
        Ok(())
    }

    // JUMPI operation
    pub fn op_jumpi(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [jump_address, condition] = *current_call_frame.stack.pop()?;

        if !condition.is_zero() {
            Self::jump(current_call_frame, jump_address)?;
        }

        Ok(OpcodeResult::Continue)
    }

    // JUMPDEST operation
    pub fn op_jumpdest(&mut self) -> Result<OpcodeResult, VMError> {
        Ok(OpcodeResult::Continue)
    }

    // PC operation
    pub fn op_pc(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        // The pc already moved past this instruction.
        let pc = current_call_frame
            .pc
            .checked_sub(1)
            .ok_or(InternalError::Underflow)?;
        current_call_frame.stack.push(U256::from(pc))?;

        Ok(OpcodeResult::Continue)
    }
}
