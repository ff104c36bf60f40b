use ethereum_types::{H256, U256};

pub const WORD_SIZE_IN_BYTES_USIZE: usize = 32;
pub const WORD_SIZE_IN_BYTES_U64: u64 = 32;

pub const SUCCESS: U256 = U256([1, 0, 0, 0]);
pub const FAIL: U256 = U256([0, 0, 0, 0]);

pub const STACK_LIMIT: usize = 1024;
pub const CALL_DEPTH_LIMIT: usize = 1024;

/// EIP-170
pub const MAX_CODE_SIZE: usize = 0x6000;
/// EIP-3860
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// EIP-3541: deployed code may not start with this byte.
pub const EOF_PREFIX: u8 = 0xef;

pub const CREATE2_PREFIX: u8 = 0xff;

/// EIP-7702: code of a delegating account is this prefix and the delegate.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];
pub const DELEGATION_CODE_LEN: usize = 23;

/// Number of most recent block hashes reachable through BLOCKHASH.
pub const LAST_AVAILABLE_BLOCK_LIMIT: u64 = 256;

/// Keccak-256 of the empty byte string.
pub const EMPTY_CODE_HASH: H256 = H256([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Highest memory size, in bytes, a frame may grow to. Accesses past it fail
/// as out of gas.
pub const MAX_MEMORY_SIZE: usize = 0xFFFF_FFFF;

pub const MEMORY_EXPANSION_QUOTIENT: u64 = 512;

/// Addresses `0x01..=MAX_PRECOMPILE_ADDRESS` are queried through the host when
/// a call tree starts, to warm the ones it reports as precompiles.
pub const MAX_PRECOMPILE_ADDRESS: u64 = 0x11;
