use crate::{
    errors::{OpcodeResult, VMError},
    vm::VM,
};

// Exchange Operations (16)
// Opcodes: SWAP1 ... SWAP16

impl<'a> VM<'a> {
    // SWAP operation
    #[inline]
    pub fn op_swap<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.stack.swap(N)?;

        Ok(OpcodeResult::Continue)
    }
}
