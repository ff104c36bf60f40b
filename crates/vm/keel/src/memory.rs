use crate::{
    constants::{
        MAX_MEMORY_SIZE, MEMORY_EXPANSION_QUOTIENT, WORD_SIZE_IN_BYTES_U64,
        WORD_SIZE_IN_BYTES_USIZE,
    },
    errors::{ExceptionalHalt, InternalError, VMError},
};
use ExceptionalHalt::OutOfGas;
use bytes::Bytes;
use ethereum_types::U256;

/// Frame-scoped scratch memory.
///
/// Grows in whole words and is zero-initialised. Growth is never charged here:
/// callers price it with [`expansion_cost`] and charge the frame before
/// touching memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    buffer: Vec<u8>,
}

impl Memory {
    #[inline]
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Current size in bytes. Always a multiple of 32.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Grows memory to fit `new_memory_size` bytes, rounded up to a word.
    /// Never shrinks.
    #[inline]
    pub fn resize(&mut self, new_memory_size: usize) -> Result<(), VMError> {
        if new_memory_size == 0 {
            return Ok(());
        }

        let new_memory_size = new_memory_size
            .checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE)
            .ok_or(OutOfGas)?;
        if new_memory_size > MAX_MEMORY_SIZE {
            return Err(OutOfGas.into());
        }

        if new_memory_size > self.buffer.len() {
            self.buffer.resize(new_memory_size, 0);
        }
        Ok(())
    }

    /// Load `size` bytes from the given offset.
    #[inline]
    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Bytes, VMError> {
        if size == 0 {
            return Ok(Bytes::new());
        }
        let end = offset.checked_add(size).ok_or(OutOfGas)?;
        self.resize(end)?;

        self.buffer
            .get(offset..end)
            .map(Bytes::copy_from_slice)
            .ok_or(InternalError::Slicing.into())
    }

    /// Load a word from the given offset.
    #[inline]
    pub fn load_word(&mut self, offset: usize) -> Result<U256, VMError> {
        let end = offset
            .checked_add(WORD_SIZE_IN_BYTES_USIZE)
            .ok_or(OutOfGas)?;
        self.resize(end)?;

        self.buffer
            .get(offset..end)
            .map(U256::from_big_endian)
            .ok_or(InternalError::Slicing.into())
    }

    /// Stores the given data at the given offset.
    #[inline]
    pub fn store_data(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset.checked_add(data.len()).ok_or(OutOfGas)?;
        self.resize(end)?;

        self.buffer
            .get_mut(offset..end)
            .ok_or(InternalError::Slicing)?
            .copy_from_slice(data);
        Ok(())
    }

    /// Stores `data` at `offset` and zero-fills the rest of `total_size`.
    /// Bytes of `data` beyond `total_size` are ignored.
    pub fn store_data_zero_padded(
        &mut self,
        offset: usize,
        data: &[u8],
        total_size: usize,
    ) -> Result<(), VMError> {
        if total_size == 0 {
            return Ok(());
        }
        let end = offset.checked_add(total_size).ok_or(OutOfGas)?;
        self.resize(end)?;

        let target = self
            .buffer
            .get_mut(offset..end)
            .ok_or(InternalError::Slicing)?;
        let copy_size = data.len().min(total_size);
        let (copied, zeroed) = target.split_at_mut(copy_size);
        copied.copy_from_slice(data.get(..copy_size).ok_or(InternalError::Slicing)?);
        zeroed.fill(0);
        Ok(())
    }

    /// Stores a word at the given offset, big endian.
    #[inline]
    pub fn store_word(&mut self, offset: usize, word: U256) -> Result<(), VMError> {
        self.store_data(offset, &word.to_big_endian())
    }

    /// Copies memory between two regions, like a memmove. Either region may
    /// reach past the current size; the gap reads as zeros.
    pub fn copy_within(
        &mut self,
        from_offset: usize,
        to_offset: usize,
        size: usize,
    ) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let from_end = from_offset.checked_add(size).ok_or(OutOfGas)?;
        let to_end = to_offset.checked_add(size).ok_or(OutOfGas)?;
        self.resize(from_end.max(to_end))?;

        self.buffer.copy_within(from_offset..from_end, to_offset);
        Ok(())
    }

    pub fn store_zeros(&mut self, offset: usize, size: usize) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let end = offset.checked_add(size).ok_or(OutOfGas)?;
        self.resize(end)?;

        self.buffer
            .get_mut(offset..end)
            .ok_or(InternalError::Slicing)?
            .fill(0);
        Ok(())
    }
}

/// When a memory expansion is triggered, only the additional bytes of memory
/// must be paid for.
#[inline]
pub fn expansion_cost(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    if new_memory_size <= current_memory_size {
        return Ok(0);
    }
    cost(new_memory_size)?
        .checked_sub(cost(current_memory_size)?)
        .ok_or(InternalError::Underflow.into())
}

/// The total cost for a given memory size.
#[inline]
fn cost(memory_size: usize) -> Result<u64, VMError> {
    if memory_size > MAX_MEMORY_SIZE {
        return Err(OutOfGas.into());
    }
    let memory_size = u64::try_from(memory_size).map_err(|_| InternalError::TypeConversion)?;

    let words = memory_size.div_ceil(WORD_SIZE_IN_BYTES_U64);

    // Cost(words) = floor(words^2 / q) + 3 * words
    // words is at most 2^27 here, so nothing overflows.
    #[expect(clippy::arithmetic_side_effects)]
    let gas_cost = words * words / MEMORY_EXPANSION_QUOTIENT + 3 * words;

    Ok(gas_cost)
}

/// Memory size, in bytes, needed to touch `size` bytes from `offset`. Zero
/// sized accesses never need memory.
#[inline]
pub fn calculate_memory_size(offset: usize, size: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(0);
    }

    offset
        .checked_add(size)
        .and_then(|sum| sum.checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE))
        .filter(|size| *size <= MAX_MEMORY_SIZE)
        .ok_or(OutOfGas.into())
}
