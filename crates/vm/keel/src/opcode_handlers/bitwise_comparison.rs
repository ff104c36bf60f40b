use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{OpcodeResult, VMError},
    opcode_handlers::arithmetic::is_negative,
    utils::u256_from_bool,
    vm::VM,
};
use ethereum_types::U256;

// Comparison and Bitwise Logic Operations (14)
// Opcodes: LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR

impl<'a> VM<'a> {
    #[inline]
    pub fn op_lt(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| u256_from_bool(a < b))
    }

    #[inline]
    pub fn op_gt(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| u256_from_bool(a > b))
    }

    pub fn op_slt(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| u256_from_bool(signed_less_than(a, b)))
    }

    pub fn op_sgt(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| u256_from_bool(signed_less_than(b, a)))
    }

    #[inline]
    pub fn op_eq(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| u256_from_bool(a == b))
    }

    #[inline]
    pub fn op_iszero(&mut self) -> Result<OpcodeResult, VMError> {
        self.unary_op(|value| u256_from_bool(value.is_zero()))
    }

    #[inline]
    pub fn op_and(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a & b)
    }

    #[inline]
    pub fn op_or(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a | b)
    }

    pub fn op_xor(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a ^ b)
    }

    pub fn op_not(&mut self) -> Result<OpcodeResult, VMError> {
        self.unary_op(|value| !value)
    }

    pub fn op_byte(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(byte_at)
    }

    #[inline]
    #[allow(clippy::arithmetic_side_effects, reason = "shift is below 256")]
    pub fn op_shl(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|shift, value| match shift_amount(shift) {
            Some(shift) => value << shift,
            None => U256::zero(),
        })
    }

    #[inline]
    #[allow(clippy::arithmetic_side_effects, reason = "shift is below 256")]
    pub fn op_shr(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|shift, value| match shift_amount(shift) {
            Some(shift) => value >> shift,
            None => U256::zero(),
        })
    }

    pub fn op_sar(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(arithmetic_shift_right)
    }
}

fn signed_less_than(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        // Same sign: two's complement keeps the unsigned order.
        _ => a < b,
    }
}

/// Shifts of 256 bits or more push everything out.
fn shift_amount(shift: U256) -> Option<usize> {
    (shift < U256::from(256)).then(|| shift.as_usize())
}

/// BYTE: index 0 is the most significant byte.
fn byte_at(index: U256, value: U256) -> U256 {
    let Ok(index) = usize::try_from(index) else {
        return U256::zero();
    };
    // `U256::byte` counts from the least significant byte.
    match WORD_SIZE_IN_BYTES_USIZE
        .checked_sub(index)
        .and_then(|position| position.checked_sub(1))
    {
        Some(position) => U256::from(value.byte(position)),
        None => U256::zero(),
    }
}

/// SAR: shifts in copies of the sign bit.
#[allow(clippy::arithmetic_side_effects, reason = "0 < shift < 256")]
fn arithmetic_shift_right(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    let Some(shift) = shift_amount(shift) else {
        return if negative { U256::MAX } else { U256::zero() };
    };
    let shifted = value >> shift;
    if !negative || shift == 0 {
        return shifted;
    }
    shifted | (U256::MAX << (256 - shift))
}
