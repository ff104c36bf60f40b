use crate::{
    bytecode::Bytecode,
    call_frame::{CallFrame, Stack},
    constants::{FAIL, SUCCESS},
    errors::{
        ContextResult, ExceptionalHalt, ExecutionStatus, InternalError, OpcodeResult, VMError,
    },
    gas_cost::{self, CallGas},
    memory::{self, calculate_memory_size},
    message::{CallKind, Message},
    revision::Revision,
    utils::{
        address_to_word, calculate_create2_address, calculate_create_address,
        delegation_target, size_offset_to_usize, word_to_address, word_to_h256,
    },
    vm::{VM, precompile_context_result},
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use tracing::trace;

// System Operations (10)
// Opcodes: CREATE, CALL, CALLCODE, RETURN, DELEGATECALL, CREATE2, STATICCALL, REVERT, INVALID, SELFDESTRUCT

/// Operands of a CALL-family opcode.
#[derive(Debug, Clone, Copy)]
struct CallOperands {
    gas: U256,
    callee: Address,
    value: U256,
    args_offset: usize,
    args_size: usize,
    ret_offset: usize,
    ret_size: usize,
}

impl<'a> VM<'a> {
    pub fn op_call(&mut self) -> Result<OpcodeResult, VMError> {
        let operands = self.pop_call_operands::<true>()?;

        if self.current_call_frame.is_static && !operands.value.is_zero() {
            return Err(ExceptionalHalt::StaticModeViolation.into());
        }

        let from = self.current_call_frame.to;
        let is_static = self.current_call_frame.is_static;

        self.message_call(
            CallKind::Call,
            operands,
            from,
            operands.callee,
            operands.value,
            is_static,
        )
    }

    /// Runs the callee's code against the current account.
    pub fn op_callcode(&mut self) -> Result<OpcodeResult, VMError> {
        let operands = self.pop_call_operands::<true>()?;

        if self.current_call_frame.is_static && !operands.value.is_zero() {
            return Err(ExceptionalHalt::StaticModeViolation.into());
        }

        let to = self.current_call_frame.to;
        let is_static = self.current_call_frame.is_static;

        self.message_call(
            CallKind::CallCode,
            operands,
            to,
            to,
            operands.value,
            is_static,
        )
    }

    pub fn op_return(&mut self) -> Result<OpcodeResult, VMError> {
        self.take_output()?;
        Ok(OpcodeResult::Halt)
    }

    /// Keeps sender, value and storage of the current context.
    pub fn op_delegatecall(&mut self) -> Result<OpcodeResult, VMError> {
        let operands = self.pop_call_operands::<false>()?;

        let msg_sender = self.current_call_frame.msg_sender;
        let to = self.current_call_frame.to;
        let value = self.current_call_frame.msg_value;
        let is_static = self.current_call_frame.is_static;

        self.message_call(
            CallKind::DelegateCall,
            operands,
            msg_sender,
            to,
            value,
            is_static,
        )
    }

    pub fn op_staticcall(&mut self) -> Result<OpcodeResult, VMError> {
        let operands = self.pop_call_operands::<false>()?;

        let from = self.current_call_frame.to;

        self.message_call(
            CallKind::StaticCall,
            operands,
            from,
            operands.callee,
            U256::zero(),
            true,
        )
    }

    pub fn op_create(&mut self) -> Result<OpcodeResult, VMError> {
        let [value, offset, size] = *self.current_call_frame.stack.pop()?;
        self.create_from_memory(value, offset, size, None)
    }

    pub fn op_create2(&mut self) -> Result<OpcodeResult, VMError> {
        let [value, offset, size, salt] = *self.current_call_frame.stack.pop()?;
        self.create_from_memory(value, offset, size, Some(salt))
    }

    /// Output is kept, the frame is unwound when it is popped.
    pub fn op_revert(&mut self) -> Result<OpcodeResult, VMError> {
        self.take_output()?;
        Err(VMError::RevertOpcode)
    }

    /// Sets the frame output from the `offset, size` memory range on the
    /// stack, charging its growth.
    fn take_output(&mut self) -> Result<(), VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = *current_call_frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;
        if size == 0 {
            return Ok(());
        }

        let new_memory_size = calculate_memory_size(offset, size)?;
        current_call_frame.increase_consumed_gas(memory::expansion_cost(
            new_memory_size,
            current_call_frame.memory.len(),
        )?)?;
        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?;

        Ok(())
    }

    /// Charges CREATE or CREATE2 (hashing included when `salt` is set) for
    /// the init code at `offset, size` and starts the creation.
    fn create_from_memory(
        &mut self,
        value: U256,
        offset: U256,
        size: U256,
        salt: Option<U256>,
    ) -> Result<OpcodeResult, VMError> {
        let revision = self.env.revision;
        let current_call_frame = &mut self.current_call_frame;
        let (size, offset) = size_offset_to_usize(size, offset)?;
        let new_memory_size = calculate_memory_size(offset, size)?;

        current_call_frame.increase_consumed_gas(gas_cost::create(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
            salt.is_some(),
            revision,
        )?)?;

        self.generic_create(value, offset, size, salt)
    }

    /// Designated invalid instruction (0xFE).
    pub fn op_invalid(&mut self) -> Result<OpcodeResult, VMError> {
        Err(ExceptionalHalt::InvalidOpcode.into())
    }

    /// The host moves the balance. The account itself is only deleted before
    /// Cancun or when this call tree created it.
    pub fn op_selfdestruct(&mut self) -> Result<OpcodeResult, VMError> {
        let revision = self.env.revision;
        let beneficiary = word_to_address(self.current_call_frame.stack.pop1()?);
        let to = self.current_call_frame.to;

        let beneficiary_was_cold = !self.substate.add_accessed_address(beneficiary);
        let balance = self.host.get_balance(to)?;
        let creates_account = if revision >= Revision::SpuriousDragon {
            !balance.is_zero() && self.host.is_empty(beneficiary)?
        } else {
            !self.host.account_exists(beneficiary)?
        };

        self.current_call_frame
            .increase_consumed_gas(gas_cost::selfdestruct(
                beneficiary_was_cold,
                creates_account,
                revision,
            ))?;

        let already_destructed = self.substate.add_selfdestruct(to);
        if !already_destructed {
            self.substate
                .refund(gas_cost::selfdestruct_refund(revision));
        }

        // EIP-6780
        let destroy = revision < Revision::Cancun || self.substate.is_account_created(&to);
        self.host.self_destruct(to, beneficiary, destroy)?;

        trace!(address = ?to, ?beneficiary, %balance, destroy, "Self destruct");

        Ok(OpcodeResult::Halt)
    }

    /// Pushes a creation frame for the init code at `init_offset, init_size`.
    /// CREATE2 when `salt` is set.
    pub fn generic_create(
        &mut self,
        value: U256,
        init_offset: usize,
        init_size: usize,
        salt: Option<U256>,
    ) -> Result<OpcodeResult, VMError> {
        let revision = self.env.revision;
        let config = self.env.config;

        // EIP-3860
        if revision >= Revision::Shanghai && init_size > config.max_initcode_size {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.sub_return_data = Bytes::new();

        let gas_left = u64::try_from(current_call_frame.gas_remaining)
            .map_err(|_| InternalError::TypeConversion)?;
        let gas_limit = gas_cost::max_message_call_gas(gas_left, revision);
        current_call_frame.increase_consumed_gas(gas_limit)?;

        let code = current_call_frame.memory.load_range(init_offset, init_size)?;

        let deployer = current_call_frame.to;
        let new_depth = current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        let deployer_balance = self.host.get_balance(deployer)?;
        let deployer_nonce = self.host.get_nonce(deployer)?;

        let new_address = match salt {
            Some(salt) => calculate_create2_address(deployer, &code, word_to_h256(salt)),
            None => calculate_create_address(deployer, deployer_nonce),
        };

        // These refund the reserved gas and push 0.
        let checks = [
            (deployer_balance < value, "OutOfFund"),
            (new_depth > config.call_depth_limit, "MaxDepth"),
            (deployer_nonce == u64::MAX, "MaxNonce"),
        ];
        for (condition, reason) in checks {
            if condition {
                self.early_revert_message_call(gas_limit, reason)?;
                return Ok(OpcodeResult::Continue);
            }
        }

        self.substate.add_accessed_address(new_address);

        // Survives a failed creation.
        self.host.increment_nonce(deployer)?;

        // A collision keeps the reserved gas.
        if self.create_would_collide(new_address)? {
            trace!(address = ?new_address, "Create collision");
            self.current_call_frame.stack.push(FAIL)?;
            return Ok(OpcodeResult::Continue);
        }

        let stack = self.take_stack();
        let snapshot = self.host.snapshot();

        let new_call_frame = CallFrame::new(
            deployer,
            new_address,
            new_address,
            Bytecode::new(code),
            value,
            Bytes::new(),
            false,
            gas_limit,
            new_depth,
            true,
            0,
            0,
            stack,
            snapshot,
        );

        self.add_callframe(new_call_frame);
        self.substate.push_backup();
        self.substate.add_created_account(new_address);

        // Undone with the frame.
        if revision >= Revision::SpuriousDragon {
            self.host.increment_nonce(new_address)?; // 0 -> 1
        }
        if !value.is_zero() {
            self.host.transfer(deployer, new_address, value)?;
        }

        Ok(OpcodeResult::Continue)
    }

    /// Prices a CALL-family opcode, charges the caller and dispatches the
    /// message.
    fn message_call(
        &mut self,
        kind: CallKind,
        operands: CallOperands,
        msg_sender: Address,
        to: Address,
        value: U256,
        is_static: bool,
    ) -> Result<OpcodeResult, VMError> {
        let revision = self.env.revision;

        let address_was_cold = !self.substate.add_accessed_address(operands.callee);
        let (code_address, delegation_cost) = match self.delegation(operands.callee)? {
            Some((delegate, cost)) => (Some(delegate), cost),
            None => (None, 0),
        };
        let new_memory_size = calculate_memory_size(operands.args_offset, operands.args_size)?
            .max(calculate_memory_size(operands.ret_offset, operands.ret_size)?);

        // Only a plain CALL can bring an account into existence.
        let creates_account = match kind {
            CallKind::Call if revision >= Revision::SpuriousDragon => {
                !value.is_zero() && self.host.is_empty(to)?
            }
            CallKind::Call => !self.host.account_exists(to)?,
            _ => false,
        };
        let value_to_charge = match kind {
            CallKind::Call | CallKind::CallCode => value,
            _ => U256::zero(),
        };

        let callframe = &mut self.current_call_frame;
        let gas_left = u64::try_from(callframe.gas_remaining)
            .map_err(|_| InternalError::TypeConversion)?
            .checked_sub(delegation_cost)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        let call_gas = gas_cost::call(
            new_memory_size,
            callframe.memory.len(),
            address_was_cold,
            creates_account,
            value_to_charge,
            operands.gas,
            gas_left,
            revision,
        )?;

        callframe.increase_consumed_gas(
            call_gas
                .cost
                .checked_add(call_gas.forwarded)
                .and_then(|cost| cost.checked_add(delegation_cost))
                .ok_or(ExceptionalHalt::OutOfGas)?,
        )?;

        callframe.memory.resize(new_memory_size)?;

        let calldata = callframe
            .memory
            .load_range(operands.args_offset, operands.args_size)?;

        self.generic_call(
            kind,
            call_gas,
            msg_sender,
            to,
            code_address.unwrap_or(operands.callee),
            code_address.is_some(),
            value,
            is_static,
            calldata,
            operands.ret_offset,
            operands.ret_size,
        )
    }

    /// EIP-7702: the delegate of `address` if its code is a delegation
    /// designator, warmed, with the cost of that access. Only one level is
    /// followed.
    pub fn delegation(&mut self, address: Address) -> Result<Option<(Address, u64)>, VMError> {
        if self.env.revision < Revision::Prague {
            return Ok(None);
        }
        let Some(delegate) = delegation_target(&self.host.get_code(address)?) else {
            return Ok(None);
        };
        let delegate_was_cold = !self.substate.add_accessed_address(delegate);
        trace!(?address, ?delegate, delegate_was_cold, "Following delegation");
        Ok(Some((delegate, gas_cost::delegate_access(delegate_was_cold))))
    }

    /// Enters a message call whose gas has already been paid for. Calls that
    /// cannot start hand the forwarded gas back and push 0. A delegated call
    /// runs the code at `code_address` even if it is a precompile.
    #[allow(clippy::too_many_arguments)]
    pub fn generic_call(
        &mut self,
        kind: CallKind,
        call_gas: CallGas,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        delegated: bool,
        value: U256,
        is_static: bool,
        calldata: Bytes,
        ret_offset: usize,
        ret_size: usize,
    ) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.sub_return_data = Bytes::new();

        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        if new_depth > self.env.config.call_depth_limit {
            self.early_revert_message_call(call_gas.forwarded, "MaxDepth")?;
            return Ok(OpcodeResult::Continue);
        }

        if kind.requires_balance() && !value.is_zero() {
            let sender_balance = self.host.get_balance(msg_sender)?;
            if sender_balance < value {
                self.early_revert_message_call(call_gas.forwarded, "OutOfFund")?;
                return Ok(OpcodeResult::Continue);
            }
        }

        let gas_limit = call_gas.gas_limit;

        if !delegated && self.host.is_precompile(&code_address, self.env.revision) {
            let message = Message {
                kind,
                sender: msg_sender,
                recipient: Some(to),
                code_address,
                code: Bytes::new(),
                input: calldata,
                value,
                gas: i64::try_from(gas_limit).map_err(|_| InternalError::TypeConversion)?,
                depth: new_depth,
                is_static,
            };

            let snapshot = self.host.snapshot();
            if kind.transfers_value() && !value.is_zero() {
                self.host.transfer(msg_sender, to, value)?;
            }
            let report = self.host.call(&message)?;
            let ctx_result = precompile_context_result(&report, gas_limit);
            if !ctx_result.is_success() {
                self.host.revert_to_snapshot(snapshot)?;
            }

            trace!(address = ?code_address, status = ?ctx_result.status, "Precompile call");

            self.deliver_call_result(gas_limit, ret_offset, ret_size, &ctx_result)?;
            return Ok(OpcodeResult::Continue);
        }

        let bytecode = Bytecode::new(self.host.get_code(code_address)?);
        let stack = self.take_stack();
        let snapshot = self.host.snapshot();

        let new_call_frame = CallFrame::new(
            msg_sender,
            to,
            code_address,
            bytecode,
            value,
            calldata,
            is_static,
            gas_limit,
            new_depth,
            false,
            ret_offset,
            ret_size,
            stack,
            snapshot,
        );

        self.add_callframe(new_call_frame);
        self.substate.push_backup();

        if kind.transfers_value() && !value.is_zero() {
            self.host.transfer(msg_sender, to, value)?;
        }

        Ok(OpcodeResult::Continue)
    }

    /// Commits the frame's substate checkpoint, or rolls back both the
    /// checkpoint and the host snapshot when the frame did not succeed.
    pub fn handle_state_backup(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        if ctx_result.is_success() {
            self.substate.commit_backup()?;
        } else {
            self.substate.revert_backup()?;
            self.host
                .revert_to_snapshot(self.current_call_frame.snapshot)?;
        }

        Ok(())
    }

    /// Pops a finished child frame and resumes its parent.
    pub fn handle_return(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        self.handle_state_backup(ctx_result)?;
        let executed_call_frame = self.pop_call_frame()?;

        trace!(
            depth = executed_call_frame.depth,
            status = ?ctx_result.status,
            gas_used = ctx_result.gas_used,
            "Leaving call frame"
        );

        if executed_call_frame.is_create {
            self.handle_return_create(executed_call_frame, ctx_result)?;
        } else {
            self.handle_return_call(executed_call_frame, ctx_result)?;
        }

        Ok(())
    }

    pub fn handle_return_call(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let CallFrame {
            gas_limit,
            ret_offset,
            ret_size,
            stack,
            ..
        } = executed_call_frame;

        self.deliver_call_result(gas_limit, ret_offset, ret_size, ctx_result)?;
        self.recycle_stack(stack);

        Ok(())
    }

    pub fn handle_return_create(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let CallFrame {
            gas_limit,
            to,
            stack,
            ..
        } = executed_call_frame;

        let parent_call_frame = &mut self.current_call_frame;

        let unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        parent_call_frame.return_unused_gas(unused_gas)?;

        match ctx_result.status {
            ExecutionStatus::Success => {
                parent_call_frame.sub_return_data = Bytes::new();
                parent_call_frame.stack.push(address_to_word(to))?;
            }
            ExecutionStatus::Revert => {
                parent_call_frame.sub_return_data = ctx_result.output.clone();
                parent_call_frame.stack.push(FAIL)?;
            }
            ExecutionStatus::Failure(_) => {
                parent_call_frame.sub_return_data = Bytes::new();
                parent_call_frame.stack.push(FAIL)?;
            }
        }

        self.recycle_stack(stack);

        Ok(())
    }

    /// Hands the outcome of a finished message call to the current frame:
    /// unused gas, the output window in memory, the return data buffer and
    /// the success flag.
    fn deliver_call_result(
        &mut self,
        gas_limit: u64,
        ret_offset: usize,
        ret_size: usize,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let parent_call_frame = &mut self.current_call_frame;

        let unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        parent_call_frame.return_unused_gas(unused_gas)?;

        let copy_size = ctx_result.output.len().min(ret_size);
        let returned = ctx_result
            .output
            .get(..copy_size)
            .ok_or(InternalError::Slicing)?;
        parent_call_frame.memory.store_data(ret_offset, returned)?;

        parent_call_frame.sub_return_data = ctx_result.output.clone();

        parent_call_frame.stack.push(if ctx_result.is_success() {
            SUCCESS
        } else {
            FAIL
        })?;

        Ok(())
    }

    /// Pops the operands of a CALL-family opcode. Only CALL and CALLCODE
    /// carry a value operand.
    fn pop_call_operands<const HAS_VALUE: bool>(&mut self) -> Result<CallOperands, VMError> {
        let stack = &mut self.current_call_frame.stack;

        let [gas, callee] = *stack.pop()?;
        let value = if HAS_VALUE { stack.pop1()? } else { U256::zero() };
        let [args_offset, args_size, ret_offset, ret_size] = *stack.pop()?;

        let (args_size, args_offset) = size_offset_to_usize(args_size, args_offset)?;
        let (ret_size, ret_offset) = size_offset_to_usize(ret_size, ret_offset)?;

        Ok(CallOperands {
            gas,
            callee: word_to_address(callee),
            value,
            args_offset,
            args_size,
            ret_offset,
            ret_size,
        })
    }

    fn take_stack(&mut self) -> Stack {
        let mut stack = self.stack_pool.pop().unwrap_or_default();
        stack.clear();
        stack
    }

    fn recycle_stack(&mut self, mut stack: Stack) {
        stack.clear();
        self.stack_pool.push(stack);
    }

    /// Gives back gas reserved for a message that never started and pushes 0.
    fn early_revert_message_call(&mut self, gas_limit: u64, reason: &str) -> Result<(), VMError> {
        let callframe = &mut self.current_call_frame;
        callframe.return_unused_gas(gas_limit)?;
        callframe.stack.push(FAIL)?;

        trace!(reason, depth = callframe.depth, "Message call not started");
        Ok(())
    }
}
