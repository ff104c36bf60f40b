use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    host::Log,
    memory::calculate_memory_size,
    utils::{size_offset_to_usize, word_to_h256},
    vm::VM,
};

// Logging Operations (5)
// Opcodes: LOG0 ... LOG4

impl<'a> VM<'a> {
    // LOG operation
    pub fn op_log<const N_TOPICS: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;

        let [offset, size] = *current_call_frame.stack.pop()?;
        let topics: Vec<_> = current_call_frame
            .stack
            .pop::<N_TOPICS>()?
            .iter()
            .copied()
            .map(word_to_h256)
            .collect();
        let (size, offset) = size_offset_to_usize(size, offset)?;

        let new_memory_size = calculate_memory_size(offset, size)?;

        current_call_frame.increase_consumed_gas(gas_cost::log(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;

        let log = Log {
            address: current_call_frame.to,
            topics,
            data: current_call_frame.memory.load_range(offset, size)?,
        };

        self.host.emit_log(log)?;

        Ok(OpcodeResult::Continue)
    }
}
