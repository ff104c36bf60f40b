use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};
use ethereum_types::{U256, U512};

// Arithmetic Operations (11)
// Opcodes: ADD, SUB, MUL, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND
//
// Words are unsigned 256-bit integers; the signed opcodes read them as two's
// complement. Division and modulo by zero yield zero.

impl<'a> VM<'a> {
    #[inline]
    pub fn op_add(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a.overflowing_add(b).0)
    }

    #[inline]
    pub fn op_sub(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a.overflowing_sub(b).0)
    }

    #[inline]
    pub fn op_mul(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a.overflowing_mul(b).0)
    }

    pub fn op_div(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a.checked_div(b).unwrap_or_default())
    }

    pub fn op_sdiv(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(signed_div)
    }

    pub fn op_mod(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(|a, b| a.checked_rem(b).unwrap_or_default())
    }

    pub fn op_smod(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(signed_rem)
    }

    pub fn op_addmod(&mut self) -> Result<OpcodeResult, VMError> {
        self.ternary_op(add_mod)
    }

    pub fn op_mulmod(&mut self) -> Result<OpcodeResult, VMError> {
        self.ternary_op(mul_mod)
    }

    pub fn op_exp(&mut self) -> Result<OpcodeResult, VMError> {
        let revision = self.env.revision;
        let current_call_frame = &mut self.current_call_frame;
        let [base, exponent] = *current_call_frame.stack.pop()?;

        current_call_frame.increase_consumed_gas(gas_cost::exp(exponent, revision)?)?;
        current_call_frame
            .stack
            .push(base.overflowing_pow(exponent).0)?;

        Ok(OpcodeResult::Continue)
    }

    pub fn op_signextend(&mut self) -> Result<OpcodeResult, VMError> {
        self.binary_op(sign_extend)
    }
}

pub(crate) fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's complement negation. The minimum value maps to itself.
pub(crate) fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) { negate(value) } else { value }
}

/// SDIV. `MIN / -1` overflows back to `MIN`.
fn signed_div(dividend: U256, divisor: U256) -> U256 {
    let Some(quotient) = abs(dividend).checked_div(abs(divisor)) else {
        return U256::zero();
    };
    if is_negative(dividend) != is_negative(divisor) {
        negate(quotient)
    } else {
        quotient
    }
}

/// SMOD. The result takes the sign of the dividend.
fn signed_rem(dividend: U256, divisor: U256) -> U256 {
    let Some(remainder) = abs(dividend).checked_rem(abs(divisor)) else {
        return U256::zero();
    };
    if is_negative(dividend) {
        negate(remainder)
    } else {
        remainder
    }
}

/// Reduces a 512-bit intermediate. The result is below `modulus`, so it fits a
/// word.
fn reduce(value: U512, modulus: U256) -> U256 {
    let Some(reduced) = value.checked_rem(U512::from(modulus)) else {
        return U256::zero();
    };
    U256::try_from(reduced).unwrap_or_default()
}

fn add_mod(a: U256, b: U256, modulus: U256) -> U256 {
    let (sum, carry) = U512::from(a).overflowing_add(U512::from(b));
    debug_assert!(!carry);
    reduce(sum, modulus)
}

fn mul_mod(a: U256, b: U256, modulus: U256) -> U256 {
    reduce(a.full_mul(b), modulus)
}

/// SIGNEXTEND: extends the sign bit of the low `byte_index + 1` bytes.
fn sign_extend(byte_index: U256, value: U256) -> U256 {
    if byte_index > U256::from(30) {
        return value;
    }
    let sign_bit = byte_index.low_u32().saturating_mul(8).saturating_add(7);
    let sign_bit = usize::try_from(sign_bit).unwrap_or(255);

    #[expect(clippy::arithmetic_side_effects, reason = "sign_bit is at most 255")]
    let mask = (U256::one() << sign_bit) - U256::one();

    if value.bit(sign_bit) {
        value | !mask
    } else {
        value & mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUS_ONE: U256 = U256::MAX;

    fn neg(value: u64) -> U256 {
        negate(U256::from(value))
    }

    #[test]
    fn twos_complement_helpers() {
        assert!(is_negative(MINUS_ONE));
        assert_eq!(negate(MINUS_ONE), U256::one());
        assert_eq!(abs(MINUS_ONE), U256::one());
        assert_eq!(negate(U256::zero()), U256::zero());

        let min = U256::one() << 255;
        assert_eq!(negate(min), min);
    }

    #[test]
    fn signed_division() {
        assert_eq!(signed_div(neg(10), U256::from(3)), neg(3));
        assert_eq!(signed_div(neg(10), neg(3)), U256::from(3));
        assert_eq!(signed_div(U256::from(10), U256::zero()), U256::zero());

        let min = U256::one() << 255;
        assert_eq!(signed_div(min, MINUS_ONE), min);
    }

    #[test]
    fn signed_remainder_follows_dividend() {
        assert_eq!(signed_rem(neg(10), U256::from(3)), neg(1));
        assert_eq!(signed_rem(U256::from(10), neg(3)), U256::one());
        assert_eq!(signed_rem(neg(10), U256::zero()), U256::zero());
    }

    #[test]
    fn modular_ops_use_wide_intermediates() {
        assert_eq!(add_mod(U256::MAX, U256::from(2), U256::MAX), U256::from(2));
        assert_eq!(mul_mod(U256::MAX, U256::MAX, U256::from(12)), U256::from(9));
        assert_eq!(add_mod(U256::one(), U256::one(), U256::zero()), U256::zero());
        assert_eq!(mul_mod(U256::from(3), U256::from(4), U256::zero()), U256::zero());
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(U256::zero(), U256::from(0xff)), MINUS_ONE);
        assert_eq!(sign_extend(U256::zero(), U256::from(0x7f)), U256::from(0x7f));
        assert_eq!(sign_extend(U256::one(), U256::from(0x1_80ff)), U256::from(0x80ff) | !U256::from(0xffff));
        assert_eq!(sign_extend(U256::from(31), MINUS_ONE), MINUS_ONE);
        assert_eq!(sign_extend(U256::MAX, U256::from(5)), U256::from(5));
    }
}
