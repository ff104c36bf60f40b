use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    utils::{address_to_word, h256_to_word, size_offset_to_usize, u256_to_usize, word_to_address},
    vm::VM,
};
use ethereum_types::{Address, U256};

// Environmental Information (16)
// Opcodes: ADDRESS, BALANCE, ORIGIN, CALLER, CALLVALUE, CALLDATALOAD, CALLDATASIZE, CALLDATACOPY, CODESIZE, CODECOPY, GASPRICE, EXTCODESIZE, EXTCODECOPY, RETURNDATASIZE, RETURNDATACOPY, EXTCODEHASH

impl<'a> VM<'a> {
    pub fn op_address(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(address_to_word(self.current_call_frame.to))
    }

    pub fn op_balance(&mut self) -> Result<OpcodeResult, VMError> {
        let address = self.pop_accessed_address()?;
        let balance = self.host.get_balance(address)?;
        self.push_word(balance)
    }

    pub fn op_origin(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(address_to_word(self.env.tx.origin))
    }

    pub fn op_caller(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(address_to_word(self.current_call_frame.msg_sender))
    }

    pub fn op_callvalue(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(self.current_call_frame.msg_value)
    }

    #[inline]
    pub fn op_calldataload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let offset = current_call_frame.stack.pop1()?;
        let word = padded_word(&current_call_frame.calldata, offset);
        current_call_frame.stack.push(word)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_calldatasize(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(U256::from(self.current_call_frame.calldata.len()))
    }

    pub fn op_calldatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let Some((dest_offset, source_offset, size)) = self.charge_copy(0)? else {
            return Ok(OpcodeResult::Continue);
        };

        let current_call_frame = &mut self.current_call_frame;
        let source = current_call_frame
            .calldata
            .get(source_offset..)
            .unwrap_or_default();
        current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, source, size)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_codesize(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(U256::from(self.current_call_frame.bytecode.len()))
    }

    pub fn op_codecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let Some((dest_offset, source_offset, size)) = self.charge_copy(0)? else {
            return Ok(OpcodeResult::Continue);
        };

        let current_call_frame = &mut self.current_call_frame;
        let source = current_call_frame
            .bytecode
            .bytecode
            .get(source_offset..)
            .unwrap_or_default();
        current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, source, size)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_gasprice(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(self.env.tx.gas_price)
    }

    pub fn op_extcodesize(&mut self) -> Result<OpcodeResult, VMError> {
        let address = self.pop_accessed_address()?;
        let code_size = self.host.get_code_size(address)?;
        self.push_word(U256::from(code_size))
    }

    pub fn op_extcodecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(self.current_call_frame.stack.pop1()?);
        let address_was_cold = !self.substate.add_accessed_address(address);
        let access_cost = gas_cost::cold_account_surcharge(address_was_cold, self.env.revision);

        let Some((dest_offset, source_offset, size)) = self.charge_copy(access_cost)? else {
            return Ok(OpcodeResult::Continue);
        };

        let mut buffer = vec![0u8; size];
        let copied = self.host.copy_code(address, source_offset, &mut buffer)?;
        buffer.truncate(copied);

        self.current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, &buffer, size)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_returndatasize(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(U256::from(self.current_call_frame.sub_return_data.len()))
    }

    pub fn op_returndatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, source_offset, size] = *current_call_frame.stack.pop()?;

        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let source_offset =
            u256_to_usize(source_offset).map_err(|_| ExceptionalHalt::InvalidMemoryAccess)?;

        let new_memory_size = calculate_memory_size(dest_offset, size)?;
        current_call_frame.increase_consumed_gas(gas_cost::copy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;

        // Reading past the buffer is an error even for zero sized copies.
        let source = source_offset
            .checked_add(size)
            .and_then(|end| current_call_frame.sub_return_data.get(source_offset..end))
            .ok_or(ExceptionalHalt::InvalidMemoryAccess)?;

        if !source.is_empty() {
            current_call_frame.memory.store_data(dest_offset, source)?;
        }

        Ok(OpcodeResult::Continue)
    }

    pub fn op_extcodehash(&mut self) -> Result<OpcodeResult, VMError> {
        let address = self.pop_accessed_address()?;

        // EIP-161 empty accounts hash to zero.
        let hash = if self.host.is_empty(address)? {
            U256::zero()
        } else {
            h256_to_word(self.host.get_code_hash(address)?)
        };
        self.push_word(hash)
    }

    /// Pops an address operand, marks it accessed and charges the cold
    /// surcharge if it was not.
    fn pop_accessed_address(&mut self) -> Result<Address, VMError> {
        let address = word_to_address(self.current_call_frame.stack.pop1()?);
        let address_was_cold = !self.substate.add_accessed_address(address);

        self.current_call_frame
            .increase_consumed_gas(gas_cost::cold_account_surcharge(
                address_was_cold,
                self.env.revision,
            ))?;

        Ok(address)
    }

    /// Pops the `dest_offset, offset, size` operands of a *COPY opcode and
    /// charges the copy, the memory growth and `extra_cost`. Returns `None`
    /// for empty copies. Source offsets beyond `usize` read as the end of the
    /// source.
    fn charge_copy(&mut self, extra_cost: u64) -> Result<Option<(usize, usize, usize)>, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, source_offset, size] = *current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let source_offset = u256_to_usize(source_offset).unwrap_or(usize::MAX);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;
        let copy_cost = gas_cost::copy(new_memory_size, current_call_frame.memory.len(), size)?;
        current_call_frame.increase_consumed_gas(
            copy_cost
                .checked_add(extra_cost)
                .ok_or(ExceptionalHalt::OutOfGas)?,
        )?;

        Ok((size != 0).then_some((dest_offset, source_offset, size)))
    }
}

/// 32 bytes of `data` starting at `offset`, zero padded past its end.
fn padded_word(data: &[u8], offset: U256) -> U256 {
    let source = usize::try_from(offset)
        .ok()
        .and_then(|offset| data.get(offset..))
        .unwrap_or_default();

    let mut word = [0u8; 32];
    for (target, byte) in word.iter_mut().zip(source) {
        *target = *byte;
    }
    U256::from_big_endian(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_word_reads_past_the_end_as_zero() {
        let data = [0xaa, 0xbb];
        assert_eq!(padded_word(&data, U256::zero()), U256::from(0xaabb) << 240);
        assert_eq!(padded_word(&data, U256::one()), U256::from(0xbb) << 248);
        assert_eq!(padded_word(&data, U256::from(2)), U256::zero());
        assert_eq!(padded_word(&data, U256::MAX), U256::zero());
        assert_eq!(padded_word(&[], U256::zero()), U256::zero());
    }
}
