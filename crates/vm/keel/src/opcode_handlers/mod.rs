pub mod arithmetic;
pub mod bitwise_comparison;
pub mod block;
pub mod dup;
pub mod environment;
pub mod exchange;
pub mod keccak;
pub mod logging;
pub mod push;
pub mod stack_memory_storage_flow;
pub mod system;

use crate::{
    errors::{OpcodeResult, VMError},
    vm::VM,
};
use ethereum_types::U256;

impl<'a> VM<'a> {
    #[inline(always)]
    pub(crate) fn push_word(&mut self, word: U256) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.stack.push(word)?;
        Ok(OpcodeResult::Continue)
    }

    /// Replaces the top word with `op(top)`.
    #[inline(always)]
    pub(crate) fn unary_op(&mut self, op: impl FnOnce(U256) -> U256) -> Result<OpcodeResult, VMError> {
        let stack = &mut self.current_call_frame.stack;
        let value = stack.pop1()?;
        stack.push(op(value))?;
        Ok(OpcodeResult::Continue)
    }

    /// Pops `a` (the top) and `b`, pushes `op(a, b)`.
    #[inline(always)]
    pub(crate) fn binary_op(
        &mut self,
        op: impl FnOnce(U256, U256) -> U256,
    ) -> Result<OpcodeResult, VMError> {
        let stack = &mut self.current_call_frame.stack;
        let [a, b] = *stack.pop()?;
        stack.push(op(a, b))?;
        Ok(OpcodeResult::Continue)
    }

    #[inline(always)]
    pub(crate) fn ternary_op(
        &mut self,
        op: impl FnOnce(U256, U256, U256) -> U256,
    ) -> Result<OpcodeResult, VMError> {
        let stack = &mut self.current_call_frame.stack;
        let [a, b, c] = *stack.pop()?;
        stack.push(op(a, b, c))?;
        Ok(OpcodeResult::Continue)
    }
}
