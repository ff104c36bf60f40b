use crate::{
    constants::EOF_PREFIX,
    errors::{ContextResult, ExceptionalHalt, ExecutionStatus, VMError},
    gas_cost,
    revision::Revision,
    vm::VM,
};
use bytes::Bytes;
use std::mem;
use tracing::{trace, warn};

impl<'a> VM<'a> {
    /// Result of a frame that halted normally. Init code frames deploy their
    /// output here, which can still make them fail.
    pub fn handle_opcode_result(&mut self) -> Result<ContextResult, VMError> {
        if self.current_call_frame.is_create
            && let Err(error) = self.deploy_created_code()
        {
            return self.handle_opcode_error(error);
        }

        let call_frame = &self.current_call_frame;
        Ok(ContextResult {
            status: ExecutionStatus::Success,
            gas_used: call_frame.gas_used()?,
            output: call_frame.output.clone(),
        })
    }

    /// Result of a frame that stopped on an error. REVERT keeps its output
    /// and unused gas, everything else consumes the whole frame.
    pub fn handle_opcode_error(&mut self, error: VMError) -> Result<ContextResult, VMError> {
        let call_frame = &mut self.current_call_frame;

        if let VMError::RevertOpcode = error {
            return Ok(ContextResult {
                status: ExecutionStatus::Revert,
                gas_used: call_frame.gas_used()?,
                output: mem::take(&mut call_frame.output),
            });
        }

        match &error {
            VMError::Host(_) | VMError::Internal(_) => {
                warn!(%error, depth = call_frame.depth, to = ?call_frame.to, "Call frame aborted");
            }
            _ => trace!(%error, depth = call_frame.depth, pc = call_frame.pc, "Call frame halted"),
        }

        let halt = error
            .to_halt()
            .unwrap_or(ExceptionalHalt::InternalHostError);
        Ok(ContextResult::failure(halt, call_frame.gas_limit))
    }

    /// Validates the output of an init code frame, charges the deposit and
    /// installs it as the code of the new account.
    fn deploy_created_code(&mut self) -> Result<(), VMError> {
        let revision = self.env.revision;
        let max_code_size = self.env.config.max_code_size;
        let call_frame = &mut self.current_call_frame;
        let code = call_frame.output.clone();

        // [EIP-170]
        if revision >= Revision::SpuriousDragon && code.len() > max_code_size {
            return Err(ExceptionalHalt::InvalidCreateOutput.into());
        }
        // [EIP-3541]
        if revision >= Revision::London && code.first() == Some(&EOF_PREFIX) {
            return Err(ExceptionalHalt::InvalidCreateOutput.into());
        }

        let code = match call_frame.increase_consumed_gas(gas_cost::code_deposit(code.len())?) {
            Ok(()) => code,
            // Frontier kept the account and dropped the code.
            Err(_) if revision < Revision::Homestead => Bytes::new(),
            Err(halt) => return Err(halt.into()),
        };

        let address = call_frame.to;
        self.host.set_code(address, code)?;

        Ok(())
    }
}
