//! Gas prices, per revision.
//!
//! Static costs are charged by the interpreter loop before a handler runs and
//! live in a [`GasSchedule`] table. Everything that depends on operands or
//! state is priced by the functions in this module and charged by the
//! handlers themselves.

use crate::{
    constants::WORD_SIZE_IN_BYTES_U64,
    errors::{ExceptionalHalt, InternalError, VMError},
    host::StorageStatus,
    memory,
    opcodes::Opcode,
    revision::Revision,
};
use ExceptionalHalt::OutOfGas;
use ethereum_types::U256;
use lazy_static::lazy_static;

// Tiers
pub const ZERO: u64 = 0;
pub const JUMPDEST_COST: u64 = 1;
pub const BASE: u64 = 2;
pub const VERY_LOW: u64 = 3;
pub const LOW: u64 = 5;
pub const MID: u64 = 8;
pub const HIGH: u64 = 10;
pub const BLOCKHASH_COST: u64 = 20;
pub const KECCAK25_STATIC: u64 = 30;
pub const TRANSIENT_STORAGE: u64 = 100;

pub const KECCAK25_DYNAMIC_BASE: u64 = 6;
pub const COPY_DYNAMIC_BASE: u64 = 3;
pub const LOGN_STATIC: u64 = 375;
pub const LOGN_DYNAMIC_BASE: u64 = 375;
pub const LOGN_DYNAMIC_BYTE_BASE: u64 = 8;

pub const EXP_DYNAMIC_BASE_FRONTIER: u64 = 10;
/// EIP-160
pub const EXP_DYNAMIC_BASE: u64 = 50;

// Account access. Pre-Berlin prices are folded into the static table.
pub const WARM_ADDRESS_ACCESS_COST: u64 = 100;
pub const COLD_ADDRESS_ACCESS_COST: u64 = 2600;
pub const COLD_STORAGE_ACCESS_COST: u64 = 2100;

// Storage
pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 5000;
pub const SSTORE_STIPEND: u64 = 2300;
pub const SSTORE_CLEARS_REFUND: u64 = 15000;
/// EIP-3529: SSTORE_RESET - COLD_SLOAD + ACCESS_LIST_STORAGE_KEY
pub const SSTORE_CLEARS_REFUND_LONDON: u64 = 4800;

// Calls
pub const CALL_POSITIVE_VALUE: u64 = 9000;
pub const CALL_POSITIVE_VALUE_STIPEND: u64 = 2300;
pub const CALL_TO_EMPTY_ACCOUNT: u64 = 25000;

// Creation
pub const CREATE_BASE_COST: u64 = 32000;
pub const CODE_DEPOSIT_COST: u64 = 200;
pub const INIT_CODE_WORD_COST: u64 = 2;

pub const SELFDESTRUCT_STATIC: u64 = 5000;
pub const SELFDESTRUCT_REFUND: u64 = 24000;

/// Static cost of every opcode under one revision. Undefined opcodes cost
/// nothing; they fail when dispatched.
#[derive(Debug, Clone)]
pub struct GasSchedule {
    pub revision: Revision,
    static_costs: [u64; 256],
}

lazy_static! {
    static ref SCHEDULES: [GasSchedule; 13] = Revision::ALL.map(GasSchedule::new);
}

impl GasSchedule {
    pub fn new(revision: Revision) -> Self {
        let mut static_costs = [ZERO; 256];
        for (byte, cost) in (0..=u8::MAX).zip(static_costs.iter_mut()) {
            *cost = static_cost(Opcode::from(byte), revision);
        }
        Self {
            revision,
            static_costs,
        }
    }

    /// Shared schedule for `revision`.
    pub fn for_revision(revision: Revision) -> &'static GasSchedule {
        #[expect(clippy::as_conversions, clippy::indexing_slicing)]
        let schedule = &SCHEDULES[revision as usize];
        schedule
    }

    #[inline(always)]
    pub fn static_cost(&self, opcode: u8) -> u64 {
        #[expect(clippy::indexing_slicing)] // 256 entries, one per byte
        let cost = self.static_costs[usize::from(opcode)];
        cost
    }
}

fn static_cost(opcode: Opcode, revision: Revision) -> u64 {
    use Opcode::*;

    if !opcode.is_defined_in(revision) {
        return ZERO;
    }

    let berlin = revision >= Revision::Berlin;
    let istanbul = revision >= Revision::Istanbul;
    let tangerine = revision >= Revision::TangerineWhistle;

    match opcode {
        STOP | RETURN | REVERT | SSTORE | INVALID => ZERO,
        JUMPDEST => JUMPDEST_COST,
        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
        | RETURNDATASIZE | COINBASE | TIMESTAMP | NUMBER | PREVRANDAO | GASLIMIT | CHAINID
        | BASEFEE | BLOBBASEFEE | POP | PC | MSIZE | GAS | PUSH0 => BASE,
        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => LOW,
        ADDMOD | MULMOD | JUMP => MID,
        EXP | JUMPI => HIGH,
        BLOCKHASH => BLOCKHASH_COST,
        KECCAK256 => KECCAK25_STATIC,
        BALANCE if berlin => WARM_ADDRESS_ACCESS_COST,
        BALANCE if istanbul => 700,
        BALANCE if tangerine => 400,
        BALANCE => 20,
        EXTCODESIZE | EXTCODECOPY if berlin => WARM_ADDRESS_ACCESS_COST,
        EXTCODESIZE | EXTCODECOPY if tangerine => 700,
        EXTCODESIZE | EXTCODECOPY => 20,
        EXTCODEHASH if berlin => WARM_ADDRESS_ACCESS_COST,
        EXTCODEHASH if istanbul => 700,
        EXTCODEHASH => 400,
        SLOAD if berlin => WARM_ADDRESS_ACCESS_COST,
        SLOAD if istanbul => 800,
        SLOAD if tangerine => 200,
        SLOAD => 50,
        TLOAD | TSTORE => TRANSIENT_STORAGE,
        LOG0 => LOGN_STATIC,
        LOG1 => LOGN_STATIC + LOGN_DYNAMIC_BASE,
        LOG2 => LOGN_STATIC + 2 * LOGN_DYNAMIC_BASE,
        LOG3 => LOGN_STATIC + 3 * LOGN_DYNAMIC_BASE,
        LOG4 => LOGN_STATIC + 4 * LOGN_DYNAMIC_BASE,
        CREATE | CREATE2 => CREATE_BASE_COST,
        CALL | CALLCODE | DELEGATECALL | STATICCALL if berlin => WARM_ADDRESS_ACCESS_COST,
        CALL | CALLCODE | DELEGATECALL | STATICCALL if tangerine => 700,
        CALL | CALLCODE | DELEGATECALL | STATICCALL => 40,
        SELFDESTRUCT if tangerine => SELFDESTRUCT_STATIC,
        SELFDESTRUCT => ZERO,
        // Arithmetic, comparison, bitwise, memory, push, dup and swap.
        _ => VERY_LOW,
    }
}

/// Number of words needed for `size` bytes.
#[inline]
fn words(size: usize) -> Result<u64, VMError> {
    let size = u64::try_from(size).map_err(|_| InternalError::TypeConversion)?;
    Ok(size.div_ceil(WORD_SIZE_IN_BYTES_U64))
}

/// Memory expansion plus a per-word charge over `size` bytes.
fn memory_and_per_word(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    per_word: u64,
) -> Result<u64, VMError> {
    let memory_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    words(size)?
        .checked_mul(per_word)
        .and_then(|word_cost| word_cost.checked_add(memory_cost))
        .ok_or(OutOfGas.into())
}

pub fn exp(exponent: U256, revision: Revision) -> Result<u64, VMError> {
    let exponent_byte_size = u64::try_from(exponent.bits().div_ceil(8))
        .map_err(|_| InternalError::TypeConversion)?;
    let per_byte = if revision >= Revision::SpuriousDragon {
        EXP_DYNAMIC_BASE
    } else {
        EXP_DYNAMIC_BASE_FRONTIER
    };
    exponent_byte_size
        .checked_mul(per_byte)
        .ok_or(OutOfGas.into())
}

pub fn keccak256(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    memory_and_per_word(
        new_memory_size,
        current_memory_size,
        size,
        KECCAK25_DYNAMIC_BASE,
    )
}

/// CALLDATACOPY, CODECOPY, RETURNDATACOPY, EXTCODECOPY and MCOPY.
pub fn copy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    memory_and_per_word(new_memory_size, current_memory_size, size, COPY_DYNAMIC_BASE)
}

/// Data part of LOGn. The base and per-topic parts are static.
pub fn log(new_memory_size: usize, current_memory_size: usize, size: usize) -> Result<u64, VMError> {
    let memory_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    u64::try_from(size)
        .ok()
        .and_then(|size| size.checked_mul(LOGN_DYNAMIC_BYTE_BASE))
        .and_then(|data_cost| data_cost.checked_add(memory_cost))
        .ok_or(OutOfGas.into())
}

/// Extra charge for touching a cold account (EIP-2929). The warm part is
/// static.
pub fn cold_account_surcharge(address_was_cold: bool, revision: Revision) -> u64 {
    if address_was_cold && revision >= Revision::Berlin {
        COLD_ADDRESS_ACCESS_COST - WARM_ADDRESS_ACCESS_COST
    } else {
        ZERO
    }
}

/// Full access charge of an EIP-7702 delegate, which has no static part.
pub fn delegate_access(delegate_was_cold: bool) -> u64 {
    if delegate_was_cold {
        COLD_ADDRESS_ACCESS_COST
    } else {
        WARM_ADDRESS_ACCESS_COST
    }
}

/// Extra charge for an SLOAD of a cold slot (EIP-2929).
pub fn cold_sload_surcharge(slot_was_cold: bool, revision: Revision) -> u64 {
    if slot_was_cold && revision >= Revision::Berlin {
        COLD_STORAGE_ACCESS_COST - WARM_ADDRESS_ACCESS_COST
    } else {
        ZERO
    }
}

/// Cost of a warm SLOAD as used by net gas metering.
fn sstore_noop_cost(revision: Revision) -> u64 {
    if revision >= Revision::Berlin {
        WARM_ADDRESS_ACCESS_COST
    } else {
        800
    }
}

fn sstore_reset_cost(revision: Revision) -> u64 {
    if revision >= Revision::Berlin {
        SSTORE_RESET - COLD_STORAGE_ACCESS_COST
    } else {
        SSTORE_RESET
    }
}

fn sstore_clears_refund(revision: Revision) -> i64 {
    let refund = if revision >= Revision::London {
        SSTORE_CLEARS_REFUND_LONDON
    } else {
        SSTORE_CLEARS_REFUND
    };
    i64::try_from(refund).unwrap_or(i64::MAX)
}

/// Whether SSTORE uses net gas metering (EIP-2200).
pub fn is_net_metered(revision: Revision) -> bool {
    revision >= Revision::Istanbul
}

pub fn sstore(status: StorageStatus, slot_was_cold: bool, revision: Revision) -> u64 {
    use StorageStatus::*;

    if !is_net_metered(revision) {
        return match status {
            Added | DeletedAdded | DeletedRestored => SSTORE_SET,
            _ => SSTORE_RESET,
        };
    }

    let cost = match status {
        Added => SSTORE_SET,
        Deleted | Modified => sstore_reset_cost(revision),
        Assigned | DeletedAdded | ModifiedDeleted | DeletedRestored | AddedDeleted
        | ModifiedRestored => sstore_noop_cost(revision),
    };
    let cold = if slot_was_cold && revision >= Revision::Berlin {
        COLD_STORAGE_ACCESS_COST
    } else {
        ZERO
    };
    cost.saturating_add(cold)
}

/// Refund counter change for a storage write. Negative when an earlier
/// refund is taken back.
pub fn sstore_refund(status: StorageStatus, revision: Revision) -> i64 {
    use StorageStatus::*;

    let clears = sstore_clears_refund(revision);
    if !is_net_metered(revision) {
        return match status {
            Deleted | ModifiedDeleted | AddedDeleted => clears,
            _ => 0,
        };
    }

    let noop = i64::try_from(sstore_noop_cost(revision)).unwrap_or_default();
    let reset = i64::try_from(sstore_reset_cost(revision)).unwrap_or_default();
    let set = i64::try_from(SSTORE_SET).unwrap_or_default();

    #[expect(clippy::arithmetic_side_effects, reason = "small constants")]
    let refund = match status {
        Assigned | Added | Modified => 0,
        Deleted | ModifiedDeleted => clears,
        DeletedAdded => -clears,
        DeletedRestored => reset - noop - clears,
        AddedDeleted => set - noop,
        ModifiedRestored => reset - noop,
    };
    refund
}

/// Largest share of `gas_limit` a frame may hand to a child. EIP-150 keeps
/// back one 64th.
pub fn max_message_call_gas(gas_left: u64, revision: Revision) -> u64 {
    if revision >= Revision::TangerineWhistle {
        gas_left.saturating_sub(gas_left / 64)
    } else {
        gas_left
    }
}

/// Gas split of a CALL-family opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallGas {
    /// Dynamic cost charged to the caller on top of the static cost, not
    /// counting forwarded gas.
    pub cost: u64,
    /// Gas taken from the caller and handed to the child.
    pub forwarded: u64,
    /// Child gas limit: `forwarded` plus the value stipend.
    pub gas_limit: u64,
}

/// Prices a call. `gas_left` is the caller's gas after the static cost.
#[allow(clippy::too_many_arguments)]
pub fn call(
    new_memory_size: usize,
    current_memory_size: usize,
    address_was_cold: bool,
    creates_account: bool,
    value: U256,
    gas_from_stack: U256,
    gas_left: u64,
    revision: Revision,
) -> Result<CallGas, VMError> {
    let memory_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;
    let value_cost = if value.is_zero() {
        ZERO
    } else {
        CALL_POSITIVE_VALUE
    };
    let account_cost = if creates_account {
        CALL_TO_EMPTY_ACCOUNT
    } else {
        ZERO
    };
    let cost = memory_cost
        .checked_add(value_cost)
        .and_then(|cost| cost.checked_add(account_cost))
        .and_then(|cost| cost.checked_add(cold_account_surcharge(address_was_cold, revision)))
        .ok_or(OutOfGas)?;

    let gas_left_after_cost = gas_left.checked_sub(cost).ok_or(OutOfGas)?;
    let requested = u64::try_from(gas_from_stack).unwrap_or(u64::MAX);
    let forwarded = if revision >= Revision::TangerineWhistle {
        requested.min(max_message_call_gas(gas_left_after_cost, revision))
    } else if requested > gas_left_after_cost {
        return Err(OutOfGas.into());
    } else {
        requested
    };

    let stipend = if value.is_zero() {
        ZERO
    } else {
        CALL_POSITIVE_VALUE_STIPEND
    };
    let gas_limit = forwarded.checked_add(stipend).ok_or(OutOfGas)?;

    Ok(CallGas {
        cost,
        forwarded,
        gas_limit,
    })
}

/// Dynamic part of CREATE and CREATE2: memory, init code words from Shanghai
/// (EIP-3860) and, for CREATE2, hashing the init code.
pub fn create(
    new_memory_size: usize,
    current_memory_size: usize,
    code_size: usize,
    is_create2: bool,
    revision: Revision,
) -> Result<u64, VMError> {
    let init_code_cost = if revision >= Revision::Shanghai {
        INIT_CODE_WORD_COST
    } else {
        ZERO
    };
    let hashing_cost = if is_create2 {
        KECCAK25_DYNAMIC_BASE
    } else {
        ZERO
    };
    let per_word = init_code_cost.saturating_add(hashing_cost);
    memory_and_per_word(new_memory_size, current_memory_size, code_size, per_word)
}

/// Dynamic part of SELFDESTRUCT.
pub fn selfdestruct(beneficiary_was_cold: bool, creates_account: bool, revision: Revision) -> u64 {
    let account_cost = if creates_account && revision >= Revision::TangerineWhistle {
        CALL_TO_EMPTY_ACCOUNT
    } else {
        ZERO
    };
    let cold = if beneficiary_was_cold && revision >= Revision::Berlin {
        COLD_ADDRESS_ACCESS_COST
    } else {
        ZERO
    };
    account_cost.saturating_add(cold)
}

pub fn selfdestruct_refund(revision: Revision) -> i64 {
    if revision >= Revision::London {
        0
    } else {
        i64::try_from(SELFDESTRUCT_REFUND).unwrap_or_default()
    }
}

pub fn code_deposit(code_size: usize) -> Result<u64, VMError> {
    u64::try_from(code_size)
        .ok()
        .and_then(|size| size.checked_mul(CODE_DEPOSIT_COST))
        .ok_or(OutOfGas.into())
}

/// Refund actually granted at the end of a successful top-level execution.
/// EIP-3529 lowers the cap from a half to a fifth of the gas used.
pub fn capped_refund(refund_counter: i64, gas_used: u64, revision: Revision) -> i64 {
    let quotient = if revision >= Revision::London { 5 } else { 2 };
    let cap = i64::try_from(gas_used / quotient).unwrap_or(i64::MAX);
    refund_counter.clamp(0, cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_costs_follow_revision() {
        let frontier = GasSchedule::for_revision(Revision::Frontier);
        let berlin = GasSchedule::for_revision(Revision::Berlin);
        let istanbul = GasSchedule::for_revision(Revision::Istanbul);

        assert_eq!(frontier.static_cost(0x54), 50);
        assert_eq!(istanbul.static_cost(0x54), 800);
        assert_eq!(berlin.static_cost(0x54), 100);
        assert_eq!(frontier.static_cost(0xf1), 40);
        assert_eq!(istanbul.static_cost(0xf1), 700);
        assert_eq!(frontier.static_cost(0x01), 3);
        assert_eq!(frontier.static_cost(0xa2), 375 * 3);
        // PUSH0 does not exist before Shanghai.
        assert_eq!(berlin.static_cost(0x5f), 0);
        assert_eq!(GasSchedule::for_revision(Revision::Shanghai).static_cost(0x5f), 2);
        assert_eq!(frontier.static_cost(0xff), 0);
        assert_eq!(istanbul.static_cost(0xff), 5000);
        assert_eq!(frontier.static_cost(0x0c), 0);
    }

    #[test]
    fn exp_cost_by_exponent_bytes() {
        assert_eq!(exp(U256::zero(), Revision::Cancun).unwrap(), 0);
        assert_eq!(exp(U256::from(0xff), Revision::Cancun).unwrap(), 50);
        assert_eq!(exp(U256::from(0x100), Revision::Cancun).unwrap(), 100);
        assert_eq!(exp(U256::from(0x100), Revision::Homestead).unwrap(), 20);
    }

    #[test]
    fn net_metered_sstore() {
        use StorageStatus::*;
        assert_eq!(sstore(Added, false, Revision::Istanbul), 20000);
        assert_eq!(sstore(Modified, false, Revision::Istanbul), 5000);
        assert_eq!(sstore(Assigned, false, Revision::Istanbul), 800);
        assert_eq!(sstore(Added, true, Revision::Berlin), 22100);
        assert_eq!(sstore(Modified, true, Revision::Berlin), 5000);
        assert_eq!(sstore(Modified, false, Revision::Berlin), 2900);
        assert_eq!(sstore(Assigned, false, Revision::Berlin), 100);

        assert_eq!(sstore_refund(Deleted, Revision::Istanbul), 15000);
        assert_eq!(sstore_refund(Deleted, Revision::London), 4800);
        assert_eq!(sstore_refund(DeletedAdded, Revision::London), -4800);
        assert_eq!(sstore_refund(AddedDeleted, Revision::Berlin), 19900);
        assert_eq!(sstore_refund(ModifiedRestored, Revision::Berlin), 2800);
        assert_eq!(sstore_refund(DeletedRestored, Revision::London), 2800 - 4800);
    }

    #[test]
    fn legacy_sstore() {
        use StorageStatus::*;
        assert_eq!(sstore(Added, false, Revision::Byzantium), 20000);
        assert_eq!(sstore(Assigned, false, Revision::Byzantium), 5000);
        assert_eq!(sstore(Deleted, false, Revision::Byzantium), 5000);
        assert_eq!(sstore_refund(Deleted, Revision::Byzantium), 15000);
        assert_eq!(sstore_refund(Modified, Revision::Byzantium), 0);
    }

    #[test]
    fn call_forwards_all_but_one_64th() {
        let gas = call(0, 0, false, false, U256::zero(), U256::MAX, 6400, Revision::Cancun)
            .unwrap();
        assert_eq!(gas.cost, 0);
        assert_eq!(gas.forwarded, 6300);
        assert_eq!(gas.gas_limit, 6300);

        let gas = call(0, 0, true, false, U256::one(), U256::from(1000), 20_000, Revision::Cancun)
            .unwrap();
        assert_eq!(gas.cost, 9000 + 2500);
        assert_eq!(gas.forwarded, 1000);
        assert_eq!(gas.gas_limit, 3300);
    }

    #[test]
    fn pre_tangerine_call_needs_requested_gas() {
        let result = call(0, 0, false, false, U256::zero(), U256::from(1000), 999, Revision::Homestead);
        assert_eq!(result, Err(VMError::ExceptionalHalt(OutOfGas)));
        let gas = call(0, 0, false, false, U256::zero(), U256::from(1000), 1000, Revision::Homestead)
            .unwrap();
        assert_eq!(gas.forwarded, 1000);
    }

    #[test]
    fn refund_cap() {
        assert_eq!(capped_refund(10_000, 10_000, Revision::Berlin), 5000);
        assert_eq!(capped_refund(10_000, 10_000, Revision::London), 2000);
        assert_eq!(capped_refund(-5, 10_000, Revision::London), 0);
        assert_eq!(capped_refund(100, 10_000, Revision::London), 100);
    }
}
