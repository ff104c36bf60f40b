use crate::{
    constants::{CREATE2_PREFIX, DELEGATION_CODE_LEN, DELEGATION_PREFIX},
    errors::{ExceptionalHalt, InternalError, VMError},
};
use ethereum_types::{Address, H256, U256};
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256::from_slice(&Keccak256::digest(data.as_ref()))
}

/// Lowest 20 bytes of a stack word.
pub fn word_to_address(word: U256) -> Address {
    Address::from(word_to_h256(word))
}

pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

pub fn h256_to_word(hash: H256) -> U256 {
    U256::from_big_endian(hash.as_bytes())
}

pub fn word_to_h256(word: U256) -> H256 {
    H256(word.to_big_endian())
}

pub const fn u256_from_bool(value: bool) -> U256 {
    if value { U256::one() } else { U256::zero() }
}

pub fn u256_to_usize(value: U256) -> Result<usize, VMError> {
    usize::try_from(value).map_err(|_| InternalError::TypeConversion.into())
}

/// Converts a memory `(size, offset)` pair taken from the stack. A zero size
/// never touches memory, so its offset is irrelevant and reported as zero.
/// Values too large to index memory can never be paid for.
pub fn size_offset_to_usize(size: U256, offset: U256) -> Result<(usize, usize), VMError> {
    if size.is_zero() {
        return Ok((0, 0));
    }
    let size = usize::try_from(size).map_err(|_| ExceptionalHalt::OutOfGas)?;
    let offset = usize::try_from(offset).map_err(|_| ExceptionalHalt::OutOfGas)?;
    Ok((size, offset))
}

/// Delegate named by an EIP-7702 designator `0xef0100 ++ address`.
pub fn delegation_target(code: &[u8]) -> Option<Address> {
    if code.len() != DELEGATION_CODE_LEN {
        return None;
    }
    code.strip_prefix(DELEGATION_PREFIX.as_slice())
        .map(Address::from_slice)
}

/// `keccak256(rlp([sender, nonce]))[12..]`
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender);
    stream.append(&nonce);
    Address::from(keccak(stream.out()))
}

/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]` (EIP-1014)
pub fn calculate_create2_address(sender: Address, init_code: &[u8], salt: H256) -> Address {
    let init_code_hash = keccak(init_code);
    let mut preimage = Vec::with_capacity(85);
    preimage.push(CREATE2_PREFIX);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(init_code_hash.as_bytes());
    Address::from(keccak(preimage))
}
