use bytes::Bytes;
use ethereum_types::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VMError {
    /// Errors that halt the current frame and consume all of its gas.
    #[error("Exceptional Halt: {0}")]
    ExceptionalHalt(#[from] ExceptionalHalt),
    /// Explicit REVERT. Output is kept and unused gas goes back to the caller.
    #[error("Revert Opcode")]
    RevertOpcode,
    /// The host failed to answer a request.
    #[error("Host Error: {0}")]
    Host(#[from] HostError),
    /// Broken engine invariant. Never caused by the executed bytecode.
    #[error("Internal Error: {0}")]
    Internal(#[from] InternalError),
}

impl VMError {
    pub fn is_internal(&self) -> bool {
        matches!(self, VMError::Internal(_))
    }

    /// Failure kind this error is reported as once it reaches a frame boundary.
    pub fn to_halt(&self) -> Option<ExceptionalHalt> {
        match self {
            VMError::ExceptionalHalt(halt) => Some(*halt),
            VMError::RevertOpcode => None,
            VMError::Host(_) | VMError::Internal(_) => Some(ExceptionalHalt::InternalHostError),
        }
    }
}

/// Closed set of failure kinds a frame can end with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error,
)]
pub enum ExceptionalHalt {
    #[error("Out Of Gas")]
    OutOfGas,
    #[error("Stack Overflow")]
    StackOverflow,
    #[error("Stack Underflow")]
    StackUnderflow,
    #[error("Invalid Opcode")]
    InvalidOpcode,
    #[error("Invalid Jump")]
    InvalidJump,
    #[error("Invalid Memory Access")]
    InvalidMemoryAccess,
    #[error("Static Mode Violation")]
    StaticModeViolation,
    #[error("Call Depth Exceeded")]
    CallDepthExceeded,
    #[error("Insufficient Balance")]
    InsufficientBalance,
    #[error("Create Collision")]
    CreateCollision,
    #[error("Invalid Create Output")]
    InvalidCreateOutput,
    #[error("Precompile Failure")]
    PrecompileFailure,
    #[error("Internal Host Error")]
    InternalHostError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum InternalError {
    #[error("Arithmetic operation overflowed")]
    Overflow,
    #[error("Arithmetic operation underflowed")]
    Underflow,
    #[error("Arithmetic operation divided by zero")]
    DivisionByZero,
    #[error("Tried to convert one type to another")]
    TypeConversion,
    #[error("Tried to slice a vector out of bounds")]
    Slicing,
    #[error("Call frame not found")]
    CallFrame,
    #[error("Substate checkpoint not found")]
    MissingCheckpoint,
    #[error("{0}")]
    Custom(String),
}

impl InternalError {
    pub fn msg(msg: &'static str) -> Self {
        Self::Custom(msg.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum HostError {
    #[error("Snapshot {0} does not exist")]
    UnknownSnapshot(usize),
    #[error("Account {0:#x} cannot cover a transfer of its balance")]
    InsufficientFunds(Address),
    #[error("Nonce of account {0:#x} overflowed")]
    NonceOverflow(Address),
    #[error("Host request timed out")]
    Timeout,
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    Continue,
    Halt,
}

/// Outcome of a finished execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Revert,
    Failure(ExceptionalHalt),
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

/// Result of a single frame, before top-level accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextResult {
    pub status: ExecutionStatus,
    /// Gas consumed out of the frame's own limit.
    pub gas_used: u64,
    pub output: Bytes,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Result of a frame that failed before or during execution. Consumes the
    /// whole gas limit and discards output.
    pub fn failure(halt: ExceptionalHalt, gas_limit: u64) -> Self {
        Self {
            status: ExecutionStatus::Failure(halt),
            gas_used: gas_limit,
            output: Bytes::new(),
        }
    }
}

/// What an execution reports back to whoever started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: ExecutionStatus,
    /// Meaningful on success and revert. Zero on failure.
    pub gas_left: i64,
    /// Refund granted on top-level success, already capped.
    pub gas_refund: i64,
    pub output: Bytes,
    pub created_address: Option<Address>,
}

impl ExecutionReport {
    pub fn failure(halt: ExceptionalHalt) -> Self {
        Self {
            status: ExecutionStatus::Failure(halt),
            gas_left: 0,
            gas_refund: 0,
            output: Bytes::new(),
            created_address: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_revert(&self) -> bool {
        matches!(self.status, ExecutionStatus::Revert)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, ExecutionStatus::Failure(_))
    }
}
