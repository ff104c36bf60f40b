use crate::{
    errors::{InternalError, OpcodeResult, VMError},
    vm::VM,
};
use ethereum_types::U256;

// Push Operations
// Opcodes: PUSH0, PUSH1 ... PUSH32

impl<'a> VM<'a> {
    #[inline]
    pub fn op_push<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let call_frame = &mut self.current_call_frame;
        let immediate_end = call_frame
            .pc
            .checked_add(N)
            .ok_or(InternalError::Overflow)?;

        let value = read_immediate::<N>(&call_frame.bytecode.bytecode, call_frame.pc);
        call_frame.stack.push(value)?;
        call_frame.pc = immediate_end;

        Ok(OpcodeResult::Continue)
    }

    #[inline]
    pub fn op_push0(&mut self) -> Result<OpcodeResult, VMError> {
        self.push_word(U256::zero())
    }
}

/// The `N` bytes after `pc` as a big endian word. An immediate cut short by
/// the end of the code reads its missing low bytes as zeros.
#[inline]
fn read_immediate<const N: usize>(code: &[u8], pc: usize) -> U256 {
    let available = code.get(pc..).unwrap_or_default();
    match available.get(..N) {
        Some(bytes) => U256::from_big_endian(bytes),
        None => {
            let mut padded = [0u8; N];
            for (target, byte) in padded.iter_mut().zip(available) {
                *target = *byte;
            }
            U256::from_big_endian(&padded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_immediate_is_right_padded() {
        let code = [0x61, 0x12, 0x34, 0x62, 0xab];
        assert_eq!(read_immediate::<2>(&code, 1), U256::from(0x1234));
        assert_eq!(read_immediate::<3>(&code, 4), U256::from(0xab0000));
        assert_eq!(read_immediate::<1>(&code, 5), U256::zero());
    }
}
