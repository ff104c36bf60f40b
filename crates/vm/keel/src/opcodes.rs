use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    revision::Revision,
    vm::VM,
};
use strum::{EnumString, FromRepr};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, EnumString, FromRepr, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Stop and Arithmetic Operations
    STOP = 0x00,
    ADD = 0x01,
    MUL = 0x02,
    SUB = 0x03,
    DIV = 0x04,
    SDIV = 0x05,
    MOD = 0x06,
    SMOD = 0x07,
    ADDMOD = 0x08,
    MULMOD = 0x09,
    EXP = 0x0A,
    SIGNEXTEND = 0x0B,

    // Comparison & Bitwise Logic Operations
    LT = 0x10,
    GT = 0x11,
    SLT = 0x12,
    SGT = 0x13,
    EQ = 0x14,
    ISZERO = 0x15,
    AND = 0x16,
    OR = 0x17,
    XOR = 0x18,
    NOT = 0x19,
    BYTE = 0x1A,
    SHL = 0x1B,
    SHR = 0x1C,
    SAR = 0x1D,

    // KECCAK256
    KECCAK256 = 0x20,

    // Environmental Information
    ADDRESS = 0x30,
    BALANCE = 0x31,
    ORIGIN = 0x32,
    CALLER = 0x33,
    CALLVALUE = 0x34,
    CALLDATALOAD = 0x35,
    CALLDATASIZE = 0x36,
    CALLDATACOPY = 0x37,
    CODESIZE = 0x38,
    CODECOPY = 0x39,
    GASPRICE = 0x3A,
    EXTCODESIZE = 0x3B,
    EXTCODECOPY = 0x3C,
    RETURNDATASIZE = 0x3D,
    RETURNDATACOPY = 0x3E,
    EXTCODEHASH = 0x3F,

    // Block Information
    BLOCKHASH = 0x40,
    COINBASE = 0x41,
    TIMESTAMP = 0x42,
    NUMBER = 0x43,
    /// DIFFICULTY before Paris.
    PREVRANDAO = 0x44,
    GASLIMIT = 0x45,
    CHAINID = 0x46,
    SELFBALANCE = 0x47,
    BASEFEE = 0x48,
    BLOBHASH = 0x49,
    BLOBBASEFEE = 0x4A,

    // Stack, Memory, Storage, and Flow Operations
    POP = 0x50,
    MLOAD = 0x51,
    MSTORE = 0x52,
    MSTORE8 = 0x53,
    SLOAD = 0x54,
    SSTORE = 0x55,
    JUMP = 0x56,
    JUMPI = 0x57,
    PC = 0x58,
    MSIZE = 0x59,
    GAS = 0x5A,
    JUMPDEST = 0x5B,
    TLOAD = 0x5C,
    TSTORE = 0x5D,
    MCOPY = 0x5E,

    // Push Operations
    PUSH0 = 0x5F,
    PUSH1 = 0x60,
    PUSH2 = 0x61,
    PUSH3 = 0x62,
    PUSH4 = 0x63,
    PUSH5 = 0x64,
    PUSH6 = 0x65,
    PUSH7 = 0x66,
    PUSH8 = 0x67,
    PUSH9 = 0x68,
    PUSH10 = 0x69,
    PUSH11 = 0x6A,
    PUSH12 = 0x6B,
    PUSH13 = 0x6C,
    PUSH14 = 0x6D,
    PUSH15 = 0x6E,
    PUSH16 = 0x6F,
    PUSH17 = 0x70,
    PUSH18 = 0x71,
    PUSH19 = 0x72,
    PUSH20 = 0x73,
    PUSH21 = 0x74,
    PUSH22 = 0x75,
    PUSH23 = 0x76,
    PUSH24 = 0x77,
    PUSH25 = 0x78,
    PUSH26 = 0x79,
    PUSH27 = 0x7A,
    PUSH28 = 0x7B,
    PUSH29 = 0x7C,
    PUSH30 = 0x7D,
    PUSH31 = 0x7E,
    PUSH32 = 0x7F,

    // Duplication Operations
    DUP1 = 0x80,
    DUP2 = 0x81,
    DUP3 = 0x82,
    DUP4 = 0x83,
    DUP5 = 0x84,
    DUP6 = 0x85,
    DUP7 = 0x86,
    DUP8 = 0x87,
    DUP9 = 0x88,
    DUP10 = 0x89,
    DUP11 = 0x8A,
    DUP12 = 0x8B,
    DUP13 = 0x8C,
    DUP14 = 0x8D,
    DUP15 = 0x8E,
    DUP16 = 0x8F,

    // Swap Operations
    SWAP1 = 0x90,
    SWAP2 = 0x91,
    SWAP3 = 0x92,
    SWAP4 = 0x93,
    SWAP5 = 0x94,
    SWAP6 = 0x95,
    SWAP7 = 0x96,
    SWAP8 = 0x97,
    SWAP9 = 0x98,
    SWAP10 = 0x99,
    SWAP11 = 0x9A,
    SWAP12 = 0x9B,
    SWAP13 = 0x9C,
    SWAP14 = 0x9D,
    SWAP15 = 0x9E,
    SWAP16 = 0x9F,

    // Logging Operations
    LOG0 = 0xA0,
    LOG1 = 0xA1,
    LOG2 = 0xA2,
    LOG3 = 0xA3,
    LOG4 = 0xA4,

    // System Operations
    CREATE = 0xF0,
    CALL = 0xF1,
    CALLCODE = 0xF2,
    RETURN = 0xF3,
    DELEGATECALL = 0xF4,
    CREATE2 = 0xF5,
    STATICCALL = 0xFA,
    REVERT = 0xFD,
    INVALID = 0xFE,
    SELFDESTRUCT = 0xFF,
}

impl Opcode {
    /// First revision in which the opcode is defined.
    pub const fn introduced_in(self) -> Revision {
        match self {
            Opcode::DELEGATECALL => Revision::Homestead,
            Opcode::RETURNDATASIZE
            | Opcode::RETURNDATACOPY
            | Opcode::STATICCALL
            | Opcode::REVERT => Revision::Byzantium,
            Opcode::SHL
            | Opcode::SHR
            | Opcode::SAR
            | Opcode::EXTCODEHASH
            | Opcode::CREATE2 => Revision::Constantinople,
            Opcode::CHAINID | Opcode::SELFBALANCE => Revision::Istanbul,
            Opcode::BASEFEE => Revision::London,
            Opcode::PUSH0 => Revision::Shanghai,
            Opcode::TLOAD
            | Opcode::TSTORE
            | Opcode::MCOPY
            | Opcode::BLOBHASH
            | Opcode::BLOBBASEFEE => Revision::Cancun,
            _ => Revision::Frontier,
        }
    }

    /// Whether the opcode exists in `revision`. `INVALID` never does.
    pub const fn is_defined_in(self, revision: Revision) -> bool {
        !matches!(self, Opcode::INVALID) && revision.is_at_least(self.introduced_in())
    }

    /// Opcodes rejected outright in a static context. Value-carrying calls are
    /// checked by their handlers since they depend on operands.
    pub const fn modifies_state(self) -> bool {
        matches!(
            self,
            Opcode::SSTORE
                | Opcode::TSTORE
                | Opcode::LOG0
                | Opcode::LOG1
                | Opcode::LOG2
                | Opcode::LOG3
                | Opcode::LOG4
                | Opcode::CREATE
                | Opcode::CREATE2
                | Opcode::SELFDESTRUCT
        )
    }
}

impl From<u8> for Opcode {
    fn from(byte: u8) -> Self {
        Opcode::from_repr(byte).unwrap_or(Opcode::INVALID)
    }
}

impl From<Opcode> for u8 {
    #[allow(clippy::as_conversions)]
    fn from(opcode: Opcode) -> Self {
        opcode as u8
    }
}

impl From<Opcode> for usize {
    fn from(opcode: Opcode) -> Self {
        usize::from(u8::from(opcode))
    }
}

/// Represents an opcode function handler.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpCodeFn<'a>(fn(&'_ mut VM<'a>) -> Result<OpcodeResult, VMError>);

impl<'a> OpCodeFn<'a> {
    #[inline(always)]
    pub fn call(self, vm: &mut VM<'a>) -> Result<OpcodeResult, VMError> {
        (self.0)(vm)
    }
}

/// Registers handlers by opcode name.
macro_rules! register {
    ($table:ident, $($opcode:ident => $handler:expr),* $(,)?) => {
        $( $table[Opcode::$opcode as usize] = OpCodeFn($handler); )*
    };
}

/// Registers one handler instantiation per member of an opcode family, the
/// const argument being the offset from `$base`.
macro_rules! register_family {
    ($table:ident, $base:expr, $handler:ident, [$($n:literal),*]) => {
        $( $table[$base + $n] = OpCodeFn(VM::$handler::<$n>); )*
    };
}

impl<'a> VM<'a> {
    /// Dispatch table for `revision`: every handler of the latest revision,
    /// with the opcodes `revision` does not know routed to the invalid opcode
    /// handler.
    pub(crate) fn build_opcode_table(revision: Revision) -> [OpCodeFn<'a>; 256] {
        let mut table = Self::full_opcode_table();
        for (byte, handler) in (0..=u8::MAX).zip(table.iter_mut()) {
            if !Opcode::from(byte).is_defined_in(revision) {
                *handler = OpCodeFn(VM::on_invalid_opcode);
            }
        }
        table
    }

    #[allow(
        clippy::as_conversions,
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects
    )]
    const fn full_opcode_table() -> [OpCodeFn<'a>; 256] {
        let mut table: [OpCodeFn<'a>; 256] = [OpCodeFn(VM::on_invalid_opcode); 256];

        register!(table,
            STOP => VM::op_stop,
            ADD => VM::op_add,
            MUL => VM::op_mul,
            SUB => VM::op_sub,
            DIV => VM::op_div,
            SDIV => VM::op_sdiv,
            MOD => VM::op_mod,
            SMOD => VM::op_smod,
            ADDMOD => VM::op_addmod,
            MULMOD => VM::op_mulmod,
            EXP => VM::op_exp,
            SIGNEXTEND => VM::op_signextend,
        );
        register!(table,
            LT => VM::op_lt,
            GT => VM::op_gt,
            SLT => VM::op_slt,
            SGT => VM::op_sgt,
            EQ => VM::op_eq,
            ISZERO => VM::op_iszero,
            AND => VM::op_and,
            OR => VM::op_or,
            XOR => VM::op_xor,
            NOT => VM::op_not,
            BYTE => VM::op_byte,
            SHL => VM::op_shl,
            SHR => VM::op_shr,
            SAR => VM::op_sar,
            KECCAK256 => VM::op_keccak256,
        );
        register!(table,
            ADDRESS => VM::op_address,
            BALANCE => VM::op_balance,
            ORIGIN => VM::op_origin,
            CALLER => VM::op_caller,
            CALLVALUE => VM::op_callvalue,
            CALLDATALOAD => VM::op_calldataload,
            CALLDATASIZE => VM::op_calldatasize,
            CALLDATACOPY => VM::op_calldatacopy,
            CODESIZE => VM::op_codesize,
            CODECOPY => VM::op_codecopy,
            GASPRICE => VM::op_gasprice,
            EXTCODESIZE => VM::op_extcodesize,
            EXTCODECOPY => VM::op_extcodecopy,
            RETURNDATASIZE => VM::op_returndatasize,
            RETURNDATACOPY => VM::op_returndatacopy,
            EXTCODEHASH => VM::op_extcodehash,
        );
        register!(table,
            BLOCKHASH => VM::op_blockhash,
            COINBASE => VM::op_coinbase,
            TIMESTAMP => VM::op_timestamp,
            NUMBER => VM::op_number,
            PREVRANDAO => VM::op_prevrandao,
            GASLIMIT => VM::op_gaslimit,
            CHAINID => VM::op_chainid,
            SELFBALANCE => VM::op_selfbalance,
            BASEFEE => VM::op_basefee,
            BLOBHASH => VM::op_blobhash,
            BLOBBASEFEE => VM::op_blobbasefee,
        );
        register!(table,
            POP => VM::op_pop,
            MLOAD => VM::op_mload,
            MSTORE => VM::op_mstore,
            MSTORE8 => VM::op_mstore8,
            SLOAD => VM::op_sload,
            SSTORE => VM::op_sstore,
            JUMP => VM::op_jump,
            JUMPI => VM::op_jumpi,
            PC => VM::op_pc,
            MSIZE => VM::op_msize,
            GAS => VM::op_gas,
            JUMPDEST => VM::op_jumpdest,
            TLOAD => VM::op_tload,
            TSTORE => VM::op_tstore,
            MCOPY => VM::op_mcopy,
            PUSH0 => VM::op_push0,
        );

        register_family!(table, 0x5F, op_push, [
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
            17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32
        ]);
        // DUPn copies the item at depth n - 1.
        register_family!(table, 0x80, op_dup, [
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15
        ]);
        register_family!(table, 0x8F, op_swap, [
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16
        ]);
        register_family!(table, 0xA0, op_log, [0, 1, 2, 3, 4]);

        register!(table,
            CREATE => VM::op_create,
            CALL => VM::op_call,
            CALLCODE => VM::op_callcode,
            RETURN => VM::op_return,
            DELEGATECALL => VM::op_delegatecall,
            CREATE2 => VM::op_create2,
            STATICCALL => VM::op_staticcall,
            REVERT => VM::op_revert,
            INVALID => VM::op_invalid,
            SELFDESTRUCT => VM::op_selfdestruct,
        );

        table
    }

    /// Used within the opcode table for invalid opcodes.
    pub fn on_invalid_opcode(&mut self) -> Result<OpcodeResult, VMError> {
        Err(ExceptionalHalt::InvalidOpcode.into())
    }

    #[inline]
    pub fn op_stop(&mut self) -> Result<OpcodeResult, VMError> {
        Ok(OpcodeResult::Halt)
    }
}
