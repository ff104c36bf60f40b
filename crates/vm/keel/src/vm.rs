use crate::{
    bytecode::Bytecode,
    call_frame::{CallFrame, Stack},
    constants::MAX_PRECOMPILE_ADDRESS,
    environment::Environment,
    errors::{
        ContextResult, ExceptionalHalt, ExecutionReport, ExecutionStatus, InternalError,
        OpcodeResult, VMError,
    },
    gas_cost,
    host::Host,
    message::{CallKind, Message},
    opcodes::{OpCodeFn, Opcode},
    revision::Revision,
    substate::Substate,
    utils::{calculate_create2_address, calculate_create_address, delegation_target},
};
use bytes::Bytes;
use ethereum_types::Address;
use std::mem;
use tracing::{debug, trace, warn};

/// Interpreter for one call tree.
///
/// Frames are kept on an explicit stack: `current_call_frame` is the one
/// being stepped and `call_frames` holds its ancestors. Entering a child
/// pushes the parent there; a child that halts is popped and its result is
/// handed back to the parent, which resumes after the call opcode.
///
/// Every frame owns a host snapshot and a substate checkpoint. Both are
/// committed when the frame succeeds and rolled back otherwise.
pub struct VM<'a> {
    /// Parents of the current frame, outermost first.
    pub call_frames: Vec<CallFrame>,
    pub current_call_frame: CallFrame,
    pub env: Environment,
    pub substate: Substate,
    pub host: &'a mut dyn Host,
    /// Stacks of finished frames, reused by new ones.
    pub stack_pool: Vec<Stack>,
    /// Opcode dispatch table, built per revision.
    pub(crate) opcode_table: [OpCodeFn<'a>; 256],
}

impl<'a> VM<'a> {
    /// Prepares a call tree for `message`. Nothing is asked of the host apart
    /// from which addresses are precompiles.
    pub fn new(env: Environment, host: &'a mut dyn Host, message: &Message) -> Self {
        let revision = env.revision;
        let precompiles: Vec<Address> = (1..=MAX_PRECOMPILE_ADDRESS)
            .map(Address::from_low_u64_be)
            .filter(|address| host.is_precompile(address, revision))
            .collect();
        let substate = Substate::initialize(revision, &env.tx, precompiles);

        let current_call_frame = CallFrame::new(
            message.sender,
            // Assigned in `prepare_execution` for creates.
            message.recipient.unwrap_or_default(),
            message.code_address,
            Bytecode::new(message.code.clone()),
            message.value,
            message.input.clone(),
            message.is_static,
            u64::try_from(message.gas).unwrap_or_default(),
            message.depth,
            message.kind.is_create(),
            0,
            0,
            Stack::default(),
            0,
        );

        Self {
            call_frames: Vec::new(),
            current_call_frame,
            env,
            substate,
            host,
            stack_pool: Vec::new(),
            opcode_table: VM::build_opcode_table(revision),
        }
    }

    /// Runs the whole call tree. Every failure, including host errors, ends
    /// up in the report.
    pub fn execute(&mut self, message: &Message) -> ExecutionReport {
        match self.execute_message(message) {
            Ok(report) => report,
            Err(error) => {
                warn!(%error, "Execution aborted");
                let halt = error
                    .to_halt()
                    .unwrap_or(ExceptionalHalt::InternalHostError);
                ExecutionReport::failure(halt)
            }
        }
    }

    fn execute_message(&mut self, message: &Message) -> Result<ExecutionReport, VMError> {
        let created_address = match self.prepare_execution(message)? {
            Ok(created_address) => created_address,
            Err(halt) => {
                debug!(%halt, "Message rejected");
                return Ok(ExecutionReport::failure(halt));
            }
        };

        self.current_call_frame.snapshot = self.host.snapshot();
        self.substate.push_backup();

        let context_result = match self.enter_initial_frame(message, created_address) {
            Ok(true) => self.run_precompile(message)?,
            Ok(false) => self.run_execution()?,
            Err(error) => {
                let result = self.handle_opcode_error(error)?;
                self.handle_state_backup(&result)?;
                result
            }
        };

        self.finalize_execution(context_result, created_address)
    }

    /// Checks done before the first frame exists. Creates also derive their
    /// address and bump the sender nonce here, outside of any snapshot.
    fn prepare_execution(
        &mut self,
        message: &Message,
    ) -> Result<Result<Option<Address>, ExceptionalHalt>, VMError> {
        let revision = self.env.revision;
        let config = self.env.config;

        if message.depth > config.call_depth_limit {
            return Ok(Err(ExceptionalHalt::CallDepthExceeded));
        }
        if message.kind.requires_balance()
            && !message.value.is_zero()
            && self.host.get_balance(message.sender)? < message.value
        {
            return Ok(Err(ExceptionalHalt::InsufficientBalance));
        }

        self.substate.add_accessed_address(message.sender);

        if !message.kind.is_create() {
            self.substate
                .add_accessed_address(self.current_call_frame.to);
            // The transaction pays for the delegate, the engine only warms it.
            let delegate = delegation_target(&message.code).filter(|_| revision >= Revision::Prague);
            if let Some(delegate) = delegate {
                self.substate.add_accessed_address(delegate);
                self.current_call_frame.code_address = delegate;
                self.current_call_frame.bytecode = Bytecode::new(self.host.get_code(delegate)?);
            }
            return Ok(Ok(None));
        }

        if revision >= Revision::Shanghai && message.code.len() > config.max_initcode_size {
            return Ok(Err(ExceptionalHalt::OutOfGas));
        }

        let nonce = self.host.get_nonce(message.sender)?;
        let address = match message.kind {
            CallKind::Create2 { salt } => {
                calculate_create2_address(message.sender, &message.code, salt)
            }
            _ => calculate_create_address(message.sender, nonce),
        };
        self.host.increment_nonce(message.sender)?;
        self.substate.add_accessed_address(address);

        if self.create_would_collide(address)? {
            return Ok(Err(ExceptionalHalt::CreateCollision));
        }

        self.current_call_frame.to = address;
        self.current_call_frame.code_address = address;
        Ok(Ok(Some(address)))
    }

    /// State changes of the first frame that are undone together with it.
    /// Returns whether the message targets a precompile.
    fn enter_initial_frame(
        &mut self,
        message: &Message,
        created_address: Option<Address>,
    ) -> Result<bool, VMError> {
        let to = self.current_call_frame.to;

        if let Some(address) = created_address {
            if self.env.revision >= Revision::SpuriousDragon {
                self.host.increment_nonce(address)?;
            }
            self.substate.add_created_account(address);
        }

        if message.kind.transfers_value() && !message.value.is_zero() {
            self.host.transfer(message.sender, to, message.value)?;
        }

        Ok(created_address.is_none()
            && self
                .host
                .is_precompile(&message.code_address, self.env.revision))
    }

    /// Top-level message served by the host instead of bytecode.
    fn run_precompile(&mut self, message: &Message) -> Result<ContextResult, VMError> {
        let gas_limit = self.current_call_frame.gas_limit;
        let precompile_message = Message {
            gas: self.current_call_frame.gas_remaining,
            ..message.clone()
        };
        let report = self.host.call(&precompile_message)?;
        let result = precompile_context_result(&report, gas_limit);
        self.handle_state_backup(&result)?;
        Ok(result)
    }

    /// Main execution loop.
    pub fn run_execution(&mut self) -> Result<ContextResult, VMError> {
        loop {
            let opcode = self.current_call_frame.next_opcode();

            let op_result = self.step(opcode);

            let result = match op_result {
                Ok(OpcodeResult::Continue) => continue,
                Ok(OpcodeResult::Halt) => self.handle_opcode_result()?,
                Err(error) => self.handle_opcode_error(error)?,
            };

            if self.call_frames.is_empty() {
                self.handle_state_backup(&result)?;
                return Ok(result);
            }

            // Handle interaction between child and parent callframe.
            self.handle_return(&result)?;
        }
    }

    /// Static mode check, static cost, pc advance and dispatch of one
    /// instruction.
    #[inline(always)]
    fn step(&mut self, opcode: u8) -> Result<OpcodeResult, VMError> {
        let revision = self.env.revision;
        let schedule = self.env.schedule;
        let call_frame = &mut self.current_call_frame;

        if call_frame.is_static {
            let decoded = Opcode::from(opcode);
            if decoded.modifies_state() && decoded.is_defined_in(revision) {
                return Err(ExceptionalHalt::StaticModeViolation.into());
            }
        }

        call_frame.increase_consumed_gas(schedule.static_cost(opcode))?;
        call_frame.increment_pc_by(1)?;

        #[expect(clippy::indexing_slicing, reason = "the table has an entry per byte")]
        let handler = self.opcode_table[usize::from(opcode)];
        handler.call(self)
    }

    /// Whether deploying to `address` would overwrite an existing contract.
    pub fn create_would_collide(&mut self, address: Address) -> Result<bool, VMError> {
        Ok(self.host.get_nonce(address)? != 0 || self.host.get_code_size(address)? != 0)
    }

    pub fn add_callframe(&mut self, new_call_frame: CallFrame) {
        trace!(
            depth = new_call_frame.depth,
            to = ?new_call_frame.to,
            gas_limit = new_call_frame.gas_limit,
            is_create = new_call_frame.is_create,
            "Entering call frame"
        );
        let parent = mem::replace(&mut self.current_call_frame, new_call_frame);
        self.call_frames.push(parent);
    }

    /// Makes the parent current again and returns the finished frame.
    pub fn pop_call_frame(&mut self) -> Result<CallFrame, VMError> {
        let parent = self.call_frames.pop().ok_or(InternalError::CallFrame)?;
        Ok(mem::replace(&mut self.current_call_frame, parent))
    }

    fn finalize_execution(
        &mut self,
        context_result: ContextResult,
        created_address: Option<Address>,
    ) -> Result<ExecutionReport, VMError> {
        let gas_limit = self.current_call_frame.gas_limit;
        let gas_left = gas_limit
            .checked_sub(context_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        let gas_left = i64::try_from(gas_left).map_err(|_| InternalError::TypeConversion)?;

        let report = match context_result.status {
            ExecutionStatus::Success => ExecutionReport {
                status: ExecutionStatus::Success,
                gas_left,
                gas_refund: gas_cost::capped_refund(
                    self.substate.refunded_gas(),
                    context_result.gas_used,
                    self.env.revision,
                ),
                output: if created_address.is_some() {
                    Bytes::new()
                } else {
                    context_result.output
                },
                created_address,
            },
            ExecutionStatus::Revert => ExecutionReport {
                status: ExecutionStatus::Revert,
                gas_left,
                gas_refund: 0,
                output: context_result.output,
                created_address: None,
            },
            ExecutionStatus::Failure(halt) => ExecutionReport::failure(halt),
        };

        debug!(
            status = ?report.status,
            gas_used = context_result.gas_used,
            gas_refund = report.gas_refund,
            output_len = report.output.len(),
            "Execution finished"
        );

        Ok(report)
    }
}

/// Frame result of a host-served call with `gas_limit` available.
pub(crate) fn precompile_context_result(report: &ExecutionReport, gas_limit: u64) -> ContextResult {
    match report.status {
        ExecutionStatus::Failure(halt) => ContextResult::failure(halt, gas_limit),
        status => {
            let gas_left = u64::try_from(report.gas_left)
                .unwrap_or_default()
                .min(gas_limit);
            ContextResult {
                status,
                gas_used: gas_limit.saturating_sub(gas_left),
                output: report.output.clone(),
            }
        }
    }
}
