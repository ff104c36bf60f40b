use crate::{
    bytecode::Bytecode,
    constants::STACK_LIMIT,
    errors::{ExceptionalHalt, InternalError, VMError},
    host::SnapshotId,
    memory::Memory,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use std::fmt;

/// Operand stack of a frame.
///
/// Items live at the end of a fixed buffer: `offset` is the index of the top
/// item and equals `STACK_LIMIT` when the stack is empty. Popping hands out a
/// borrowed array of the top items, top first.
#[derive(Clone, PartialEq, Eq)]
pub struct Stack {
    pub values: Box<[U256; STACK_LIMIT]>,
    pub offset: usize,
}

impl Stack {
    /// Pops `N` items. The first element of the returned array is the former
    /// top of the stack.
    #[inline]
    pub fn pop<const N: usize>(&mut self) -> Result<&[U256; N], ExceptionalHalt> {
        let next_offset = self
            .offset
            .checked_add(N)
            .filter(|next| *next <= STACK_LIMIT)
            .ok_or(ExceptionalHalt::StackUnderflow)?;

        let values = self
            .values
            .get(self.offset..next_offset)
            .and_then(|slice| <&[U256; N]>::try_from(slice).ok())
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        self.offset = next_offset;

        Ok(values)
    }

    #[inline]
    pub fn pop1(&mut self) -> Result<U256, ExceptionalHalt> {
        let [value] = *self.pop::<1>()?;
        Ok(value)
    }

    #[inline]
    pub fn push(&mut self, value: U256) -> Result<(), ExceptionalHalt> {
        let next_offset = self
            .offset
            .checked_sub(1)
            .ok_or(ExceptionalHalt::StackOverflow)?;
        *self
            .values
            .get_mut(next_offset)
            .ok_or(ExceptionalHalt::StackOverflow)? = value;
        self.offset = next_offset;
        Ok(())
    }

    #[inline]
    pub fn push_zero(&mut self) -> Result<(), ExceptionalHalt> {
        self.push(U256::zero())
    }

    pub fn len(&self) -> usize {
        STACK_LIMIT.saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= STACK_LIMIT
    }

    /// Item `index` positions below the top, without removing it.
    pub fn peek(&self, index: usize) -> Result<U256, ExceptionalHalt> {
        self.offset
            .checked_add(index)
            .and_then(|position| self.values.get(position))
            .copied()
            .ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// Swaps the top with the item `index` positions below it.
    #[inline]
    pub fn swap(&mut self, index: usize) -> Result<(), ExceptionalHalt> {
        let target = self
            .offset
            .checked_add(index)
            .filter(|target| *target < STACK_LIMIT && index > 0)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        self.values.swap(self.offset, target);
        Ok(())
    }

    /// Pushes a copy of the item `index` positions below the top.
    #[inline]
    pub fn dup(&mut self, index: usize) -> Result<(), ExceptionalHalt> {
        let value = self.peek(index)?;
        self.push(value)
    }

    pub fn clear(&mut self) {
        self.offset = STACK_LIMIT;
    }

    /// Live items, top first.
    pub fn as_slice(&self) -> &[U256] {
        self.values.get(self.offset..).unwrap_or_default()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            values: Box::new([U256::zero(); STACK_LIMIT]),
            offset: STACK_LIMIT,
        }
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Execution state of one message: the frame the interpreter steps through.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Max gas a callframe can use
    pub gas_limit: u64,
    /// Keeps track of the remaining gas in the current context.
    pub gas_remaining: i64,
    /// Program Counter
    pub pc: usize,
    /// Address of the account that sent the message
    pub msg_sender: Address,
    /// Address of the recipient of the message. Storage and balance context.
    pub to: Address,
    /// Address of the code to execute. Usually the same as `to`, but can be
    /// different for CALLCODE and DELEGATECALL.
    pub code_address: Address,
    pub bytecode: Bytecode,
    /// Value sent along the transaction
    pub msg_value: U256,
    pub stack: Stack,
    pub memory: Memory,
    /// Data sent along the transaction. Empty in CREATE transactions.
    pub calldata: Bytes,
    /// Return data of the CURRENT CONTEXT (see docs for more details)
    pub output: Bytes,
    /// Return data of the SUB-CONTEXT (see docs for more details)
    pub sub_return_data: Bytes,
    /// Indicates if current context is static (if it is, it can't alter state)
    pub is_static: bool,
    /// Call stack current depth
    pub depth: usize,
    /// Set for CREATE and CREATE2 init code frames.
    pub is_create: bool,
    /// Memory window of the parent that receives this frame's output.
    pub ret_offset: usize,
    pub ret_size: usize,
    /// Host snapshot taken when the frame was entered.
    pub snapshot: SnapshotId,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Bytecode,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        is_create: bool,
        ret_offset: usize,
        ret_size: usize,
        stack: Stack,
        snapshot: SnapshotId,
    ) -> Self {
        Self {
            gas_limit,
            gas_remaining: i64::try_from(gas_limit).unwrap_or(i64::MAX),
            pc: 0,
            msg_sender,
            to,
            code_address,
            bytecode,
            msg_value,
            stack,
            memory: Memory::new(),
            calldata,
            output: Bytes::new(),
            sub_return_data: Bytes::new(),
            is_static,
            depth,
            is_create,
            ret_offset,
            ret_size,
            snapshot,
        }
    }

    /// Byte at the program counter. Past the end of code reads as STOP.
    #[inline(always)]
    pub fn next_opcode(&self) -> u8 {
        self.bytecode.bytecode.get(self.pc).copied().unwrap_or_default()
    }

    #[inline(always)]
    pub fn increment_pc_by(&mut self, count: usize) -> Result<(), VMError> {
        self.pc = self.pc.checked_add(count).ok_or(InternalError::Overflow)?;
        Ok(())
    }

    /// Charges `gas` to the frame. Fails without touching the counter when
    /// the frame cannot afford it.
    #[inline(always)]
    pub fn increase_consumed_gas(&mut self, gas: u64) -> Result<(), ExceptionalHalt> {
        let gas = i64::try_from(gas).map_err(|_| ExceptionalHalt::OutOfGas)?;
        if gas > self.gas_remaining {
            return Err(ExceptionalHalt::OutOfGas);
        }
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(gas)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    /// Gives back gas a child frame did not use.
    pub fn return_unused_gas(&mut self, unused: u64) -> Result<(), VMError> {
        let unused = i64::try_from(unused).map_err(|_| InternalError::TypeConversion)?;
        self.gas_remaining = self
            .gas_remaining
            .checked_add(unused)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }

    /// Gas consumed so far out of this frame's limit.
    pub fn gas_used(&self) -> Result<u64, VMError> {
        let remaining =
            u64::try_from(self.gas_remaining).map_err(|_| InternalError::TypeConversion)?;
        self.gas_limit
            .checked_sub(remaining)
            .ok_or(InternalError::Underflow.into())
    }
}
