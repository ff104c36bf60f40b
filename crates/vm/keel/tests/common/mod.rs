//! Shared helpers for the integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use ethereum_types::{Address, U256};
use keel_evm::{
    Engine, ExecutionReport, InMemoryHost, Message, Revision, host::in_memory::Account,
    opcodes::Opcode,
};

/// Gas handed to every test message unless a test needs a tighter budget.
pub const TEST_GAS: i64 = 1_000_000;

pub const SENDER: u64 = 0x100;
pub const CONTRACT: u64 = 0x42;
pub const OTHER: u64 = 0x43;

pub fn sender() -> Address {
    Address::from_low_u64_be(SENDER)
}

pub fn contract() -> Address {
    Address::from_low_u64_be(CONTRACT)
}

pub fn other() -> Address {
    Address::from_low_u64_be(OTHER)
}

/// Minimal bytecode assembler.
#[derive(Debug, Clone, Default)]
pub struct Program(Vec<u8>);

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(mut self, opcode: Opcode) -> Self {
        self.0.push(opcode.into());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    /// Pushes `value` with the shortest PUSHn that holds it (at least PUSH1).
    pub fn push(mut self, value: impl Into<U256>) -> Self {
        let value: U256 = value.into();
        let len = value.bits().div_ceil(8).max(1);
        self.0.push(0x5f + u8::try_from(len).unwrap());
        self.0.extend_from_slice(&value.to_big_endian()[32 - len..]);
        self
    }

    pub fn push_address(mut self, address: Address) -> Self {
        self.0.push(Opcode::PUSH20.into());
        self.0.extend_from_slice(address.as_bytes());
        self
    }

    /// CALL-family opcode taking a value operand (CALL, CALLCODE).
    #[allow(clippy::too_many_arguments)]
    pub fn call_with_value(
        self,
        opcode: Opcode,
        gas: u64,
        to: Address,
        value: u64,
        args_offset: u64,
        args_size: u64,
        ret_offset: u64,
        ret_size: u64,
    ) -> Self {
        self.push(ret_size)
            .push(ret_offset)
            .push(args_size)
            .push(args_offset)
            .push(value)
            .push_address(to)
            .push(gas)
            .op(opcode)
    }

    pub fn call(self, gas: u64, to: Address, value: u64, ret_offset: u64, ret_size: u64) -> Self {
        self.call_with_value(Opcode::CALL, gas, to, value, 0, 0, ret_offset, ret_size)
    }

    /// DELEGATECALL or STATICCALL without arguments.
    pub fn call_without_value(self, opcode: Opcode, gas: u64, to: Address) -> Self {
        self.push(0)
            .push(0)
            .push(0)
            .push(0)
            .push_address(to)
            .push(gas)
            .op(opcode)
    }

    /// Stores the top of the stack at memory 0 and returns that word.
    pub fn return_top(self) -> Self {
        self.push(0)
            .op(Opcode::MSTORE)
            .push(32)
            .push(0)
            .op(Opcode::RETURN)
    }

    /// Returns `size` bytes of memory starting at 0.
    pub fn return_memory(self, size: u64) -> Self {
        self.push(size).push(0).op(Opcode::RETURN)
    }

    /// Init code that deploys `runtime`, which must fit in 32 bytes.
    pub fn deploying(runtime: &[u8]) -> Self {
        let len = runtime.len();
        let mut word = [0u8; 32];
        word[..len].copy_from_slice(runtime);
        Self::new()
            .push(U256::from_big_endian(&word))
            .push(0)
            .op(Opcode::MSTORE)
            .push(u64::try_from(len).unwrap())
            .push(0)
            .op(Opcode::RETURN)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn bytes(self) -> Bytes {
        Bytes::from(self.0)
    }
}

pub fn word(value: impl Into<U256>) -> Vec<u8> {
    value.into().to_big_endian().to_vec()
}

pub fn account(code: Program) -> Account {
    Account::new(U256::zero(), code.bytes())
}

pub fn funded(balance: u64) -> Account {
    Account::new(U256::from(balance), Bytes::new())
}

/// Host where `sender()` is funded and `contract()` runs `code`.
pub fn host_with(revision: Revision, code: Program) -> InMemoryHost {
    InMemoryHost::new(revision)
        .with_account(sender(), funded(1_000_000_000))
        .with_account(contract(), account(code))
}

/// Calls `contract()` from `sender()` with [`TEST_GAS`].
pub fn call_contract(revision: Revision, host: &mut InMemoryHost) -> ExecutionReport {
    let code = host.account(&contract()).map(|account| account.code.clone());
    let message = Message::call(
        sender(),
        contract(),
        code.unwrap_or_default(),
        Bytes::new(),
        TEST_GAS,
    );
    Engine::default().execute(revision, &message, host)
}

/// Runs `code` as `contract()` and returns the report together with the host.
pub fn run(revision: Revision, code: Program) -> (ExecutionReport, InMemoryHost) {
    let mut host = host_with(revision, code);
    let report = call_contract(revision, &mut host);
    (report, host)
}

pub fn gas_used(report: &ExecutionReport) -> i64 {
    TEST_GAS - report.gas_left
}
