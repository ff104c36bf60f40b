use crate::opcodes::Opcode;
use bitvec::vec::BitVec;
use bytes::Bytes;

/// Code body together with its jump destination map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytecode {
    pub bytecode: Bytes,
    /// One bit per code byte, set on JUMPDEST bytes that are real
    /// instructions and not push immediates.
    jump_targets: BitVec,
}

impl Bytecode {
    pub fn new(bytecode: Bytes) -> Self {
        let jump_targets = analyze_jump_targets(&bytecode);
        Self {
            bytecode,
            jump_targets,
        }
    }

    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    #[inline]
    pub fn is_valid_jump_target(&self, position: usize) -> bool {
        self.jump_targets
            .get(position)
            .is_some_and(|is_target| *is_target)
    }
}

fn analyze_jump_targets(code: &[u8]) -> BitVec {
    let mut targets = BitVec::repeat(false, code.len());
    let mut position = 0usize;

    while let Some(&byte) = code.get(position) {
        if byte == u8::from(Opcode::JUMPDEST) {
            targets.set(position, true);
        }
        position = position
            .saturating_add(1)
            .saturating_add(push_immediate_size(byte));
    }

    targets
}

/// Immediate bytes following `byte`, nonzero only for PUSH1 to PUSH32.
#[inline]
pub fn push_immediate_size(byte: u8) -> usize {
    let first = u8::from(Opcode::PUSH1);
    let last = u8::from(Opcode::PUSH32);
    if (first..=last).contains(&byte) {
        usize::from(byte.saturating_sub(first)).saturating_add(1)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumpdest_in_push_data_is_not_a_target() {
        // PUSH2 0x5b5b, JUMPDEST
        let code = Bytecode::new(Bytes::from_static(&[0x61, 0x5b, 0x5b, 0x5b]));
        assert!(!code.is_valid_jump_target(0));
        assert!(!code.is_valid_jump_target(1));
        assert!(!code.is_valid_jump_target(2));
        assert!(code.is_valid_jump_target(3));
        assert!(!code.is_valid_jump_target(4));
    }

    #[test]
    fn truncated_push_at_end() {
        // JUMPDEST, PUSH32 with a single byte of data
        let code = Bytecode::new(Bytes::from_static(&[0x5b, 0x7f, 0x5b]));
        assert!(code.is_valid_jump_target(0));
        assert!(!code.is_valid_jump_target(2));
    }

    #[test]
    fn immediate_sizes() {
        assert_eq!(push_immediate_size(0x5f), 0);
        assert_eq!(push_immediate_size(0x60), 1);
        assert_eq!(push_immediate_size(0x7f), 32);
        assert_eq!(push_immediate_size(0x80), 0);
    }
}
