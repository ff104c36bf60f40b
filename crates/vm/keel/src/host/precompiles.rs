//! Precompiled contracts served by [`InMemoryHost`](super::InMemoryHost).
//!
//! Each entry charges its own cost from `gas_remaining` and returns its
//! output. Malformed input that the contract cannot interpret is a
//! [`ExceptionalHalt::PrecompileFailure`]; running short of gas is
//! [`ExceptionalHalt::OutOfGas`]. Both consume all the gas of the call.

use crate::{errors::ExceptionalHalt, revision::Revision, utils::keccak};
use bytes::Bytes;
use ethereum_types::{Address, H160, H256, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use malachite::{
    Natural,
    base::num::{
        arithmetic::traits::ModPow,
        basic::traits::{One, Zero},
        conversion::traits::PowerOf2Digits,
    },
};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub const ECRECOVER_ADDRESS: Address = precompile_address(0x01);
pub const SHA2_256_ADDRESS: Address = precompile_address(0x02);
pub const RIPEMD_160_ADDRESS: Address = precompile_address(0x03);
pub const IDENTITY_ADDRESS: Address = precompile_address(0x04);
pub const MODEXP_ADDRESS: Address = precompile_address(0x05);
pub const BLAKE2F_ADDRESS: Address = precompile_address(0x09);

pub const ECRECOVER_COST: u64 = 3000;
pub const MODEXP_MIN_COST: u64 = 200;
pub const BLAKE2F_INPUT_LENGTH: usize = 213;

#[allow(clippy::indexing_slicing)]
const fn precompile_address(index: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = index;
    H160(bytes)
}

type PrecompileFn = fn(&[u8], &mut u64, Revision) -> Result<Bytes, ExceptionalHalt>;

struct Precompile {
    address: Address,
    introduced_in: Revision,
    run: PrecompileFn,
}

const PRECOMPILES: [Precompile; 6] = [
    Precompile {
        address: ECRECOVER_ADDRESS,
        introduced_in: Revision::Frontier,
        run: ecrecover,
    },
    Precompile {
        address: SHA2_256_ADDRESS,
        introduced_in: Revision::Frontier,
        run: sha2_256,
    },
    Precompile {
        address: RIPEMD_160_ADDRESS,
        introduced_in: Revision::Frontier,
        run: ripemd_160,
    },
    Precompile {
        address: IDENTITY_ADDRESS,
        introduced_in: Revision::Frontier,
        run: identity,
    },
    Precompile {
        address: MODEXP_ADDRESS,
        introduced_in: Revision::Byzantium,
        run: modexp,
    },
    Precompile {
        address: BLAKE2F_ADDRESS,
        introduced_in: Revision::Istanbul,
        run: blake2f,
    },
];

fn find(address: &Address, revision: Revision) -> Option<&'static Precompile> {
    PRECOMPILES
        .iter()
        .find(|precompile| precompile.address == *address && precompile.introduced_in <= revision)
}

pub fn is_precompile(address: &Address, revision: Revision) -> bool {
    find(address, revision).is_some()
}

/// Runs the precompile at `address`, or returns `None` if there is none in
/// `revision`.
pub fn execute_precompile(
    address: &Address,
    input: &[u8],
    gas_remaining: &mut u64,
    revision: Revision,
) -> Option<Result<Bytes, ExceptionalHalt>> {
    find(address, revision).map(|precompile| (precompile.run)(input, gas_remaining, revision))
}

fn charge(gas_remaining: &mut u64, cost: u64) -> Result<(), ExceptionalHalt> {
    *gas_remaining = gas_remaining
        .checked_sub(cost)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    Ok(())
}

/// `base + per_word` for every started 32-byte word of input.
fn word_priced(base: u64, per_word: u64, input: &[u8]) -> u64 {
    let words = u64::try_from(input.len().div_ceil(32)).unwrap_or(u64::MAX);
    words.saturating_mul(per_word).saturating_add(base)
}

/// `len` bytes of `data` from `offset`, zero padded past its end.
fn read_padded(data: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let available = data.get(offset..).unwrap_or_default();
    for (target, byte) in out.iter_mut().zip(available) {
        *target = *byte;
    }
    out
}

fn ecrecover(input: &[u8], gas_remaining: &mut u64, _: Revision) -> Result<Bytes, ExceptionalHalt> {
    charge(gas_remaining, ECRECOVER_COST)?;

    // Invalid signatures succeed with empty output.
    let output = recover_signer(&read_padded(input, 0, 128))
        .map(|signer| Bytes::copy_from_slice(H256::from(signer).as_bytes()))
        .unwrap_or_default();
    Ok(output)
}

/// `hash ‖ v ‖ r ‖ s`, with `v` a full word holding 27 or 28.
fn recover_signer(input: &[u8]) -> Option<Address> {
    let (hash, rest) = input.split_at_checked(32)?;
    let (v, signature) = rest.split_at_checked(32)?;

    let (v_high, v_low) = v.split_at_checked(31)?;
    if v_high.iter().any(|byte| *byte != 0) {
        return None;
    }
    let parity = v_low.first()?.checked_sub(27).filter(|parity| *parity <= 1)?;
    let mut recovery_id = RecoveryId::from_byte(parity)?;

    let mut signature = Signature::from_slice(signature).ok()?;
    // The key recovery only takes low-s signatures. Negating s flips the
    // parity of R.
    if let Some(low_s) = signature.normalize_s() {
        signature = low_s;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let key = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id).ok()?;
    let point = key.to_encoded_point(false);
    let public_key = point.as_bytes().get(1..)?;
    let digest = keccak(public_key);
    Some(Address::from_slice(digest.as_bytes().get(12..)?))
}

fn sha2_256(input: &[u8], gas_remaining: &mut u64, _: Revision) -> Result<Bytes, ExceptionalHalt> {
    charge(gas_remaining, word_priced(60, 12, input))?;
    Ok(Bytes::copy_from_slice(&Sha256::digest(input)))
}

fn ripemd_160(input: &[u8], gas_remaining: &mut u64, _: Revision) -> Result<Bytes, ExceptionalHalt> {
    charge(gas_remaining, word_priced(600, 120, input))?;
    let digest = Ripemd160::digest(input);
    Ok(Bytes::copy_from_slice(H256::from(H160::from_slice(&digest)).as_bytes()))
}

fn identity(input: &[u8], gas_remaining: &mut u64, _: Revision) -> Result<Bytes, ExceptionalHalt> {
    charge(gas_remaining, word_priced(15, 3, input))?;
    Ok(Bytes::copy_from_slice(input))
}

/// EIP-198 `base^exponent % modulus` over big-endian operands whose lengths
/// lead the input.
fn modexp(input: &[u8], gas_remaining: &mut u64, revision: Revision) -> Result<Bytes, ExceptionalHalt> {
    let base_len = U256::from_big_endian(&read_padded(input, 0, 32));
    let exponent_len = U256::from_big_endian(&read_padded(input, 32, 32));
    let modulus_len = U256::from_big_endian(&read_padded(input, 64, 32));

    // The leading word of the exponent prices the call.
    let exponent_offset = usize::try_from(base_len)
        .ok()
        .and_then(|len| len.checked_add(96));
    let exponent_head = match exponent_offset {
        Some(offset) => {
            let head_len = usize::try_from(exponent_len.min(U256::from(32))).unwrap_or_default();
            U256::from_big_endian(&read_padded(input, offset, head_len))
        }
        None => U256::zero(),
    };
    charge(
        gas_remaining,
        modexp_cost(base_len, exponent_len, modulus_len, exponent_head, revision),
    )?;

    if modulus_len.is_zero() {
        return Ok(Bytes::new());
    }

    // The charge bounds every length from here on.
    let to_usize = |len: U256| usize::try_from(len).map_err(|_| ExceptionalHalt::OutOfGas);
    let (base_len, exponent_len, modulus_len) =
        (to_usize(base_len)?, to_usize(exponent_len)?, to_usize(modulus_len)?);
    let exponent_offset = exponent_offset.ok_or(ExceptionalHalt::OutOfGas)?;
    let modulus_offset = exponent_offset
        .checked_add(exponent_len)
        .ok_or(ExceptionalHalt::OutOfGas)?;

    let base = natural(&read_padded(input, 96, base_len));
    let exponent = natural(&read_padded(input, exponent_offset, exponent_len));
    let modulus = natural(&read_padded(input, modulus_offset, modulus_len));

    let result: Vec<u8> = PowerOf2Digits::<u8>::to_power_of_2_digits_desc(
        &mod_exp(base, exponent, modulus),
        8,
    );

    let mut output = vec![0u8; modulus_len];
    let start = modulus_len.saturating_sub(result.len());
    for (target, byte) in output.iter_mut().skip(start).zip(&result) {
        *target = *byte;
    }
    Ok(Bytes::from(output))
}

fn natural(big_endian: &[u8]) -> Natural {
    Natural::from_power_of_2_digits_desc(8, big_endian.iter().copied()).unwrap_or(Natural::ZERO)
}

#[allow(clippy::arithmetic_side_effects, reason = "the modulus is checked for zero")]
fn mod_exp(base: Natural, exponent: Natural, modulus: Natural) -> Natural {
    if modulus == Natural::ZERO {
        Natural::ZERO
    } else if exponent == Natural::ZERO {
        Natural::ONE % modulus
    } else {
        (base % &modulus).mod_pow(&exponent, &modulus)
    }
}

/// EIP-198 pricing, EIP-2565 from Berlin.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "operands fit in 64 bits and are multiplied in 128"
)]
fn modexp_cost(
    base_len: U256,
    exponent_len: U256,
    modulus_len: U256,
    exponent_head: U256,
    revision: Revision,
) -> u64 {
    let Ok(max_len) = u64::try_from(base_len.max(modulus_len)) else {
        return u64::MAX;
    };
    let iterations = adjusted_exponent_length(exponent_len, exponent_head).max(1);

    let cost = if revision >= Revision::Berlin {
        let words = u128::from(max_len.div_ceil(8));
        (words * words).saturating_mul(iterations) / 3
    } else {
        let x = u128::from(max_len);
        let complexity = if x <= 64 {
            x * x
        } else if x <= 1024 {
            x * x / 4 + 96 * x - 3072
        } else {
            x * x / 16 + 480 * x - 199_680
        };
        complexity.saturating_mul(iterations) / 20
    };

    let cost = u64::try_from(cost).unwrap_or(u64::MAX);
    if revision >= Revision::Berlin {
        cost.max(MODEXP_MIN_COST)
    } else {
        cost
    }
}

/// Index of the highest set bit of the exponent, counting 8 bits for every
/// byte past the first 32.
fn adjusted_exponent_length(exponent_len: U256, exponent_head: U256) -> u128 {
    let head_bits = u128::try_from(exponent_head.bits())
        .unwrap_or_default()
        .saturating_sub(1);
    if exponent_len <= U256::from(32) {
        return head_bits;
    }
    let Ok(exponent_len) = u64::try_from(exponent_len) else {
        return u128::MAX;
    };
    u128::from(exponent_len.saturating_sub(32))
        .saturating_mul(8)
        .saturating_add(head_bits)
}

/// EIP-152 BLAKE2b compression function `F`.
fn blake2f(input: &[u8], gas_remaining: &mut u64, _: Revision) -> Result<Bytes, ExceptionalHalt> {
    if input.len() != BLAKE2F_INPUT_LENGTH {
        return Err(ExceptionalHalt::PrecompileFailure);
    }
    let (rounds, rest) = input
        .split_first_chunk::<4>()
        .ok_or(ExceptionalHalt::PrecompileFailure)?;
    let (state, rest) = rest.split_at(64);
    let (message, rest) = rest.split_at(128);
    let (offsets, flag) = rest.split_at(16);
    let last_block = match flag {
        [0] => false,
        [1] => true,
        _ => return Err(ExceptionalHalt::PrecompileFailure),
    };

    let rounds = u32::from_be_bytes(*rounds);
    charge(gas_remaining, u64::from(rounds))?;

    let mut state: [u64; 8] = le_words(state);
    blake2b_compress(
        rounds,
        &mut state,
        &le_words(message),
        le_words(offsets),
        last_block,
    );

    Ok(state.iter().flat_map(|word| word.to_le_bytes()).collect())
}

fn le_words<const N: usize>(bytes: &[u8]) -> [u64; N] {
    let mut words = [0u64; N];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
        *word = u64::from_le_bytes(chunk.try_into().unwrap_or_default());
    }
    words
}

const BLAKE2B_IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

#[allow(clippy::indexing_slicing, reason = "all indices are below 16")]
fn blake2b_compress(
    rounds: u32,
    state: &mut [u64; 8],
    message: &[u64; 16],
    offsets: [u64; 2],
    last_block: bool,
) {
    let mut v = [0u64; 16];
    v[..8].copy_from_slice(state);
    v[8..].copy_from_slice(&BLAKE2B_IV);
    v[12] ^= offsets[0];
    v[13] ^= offsets[1];
    if last_block {
        v[14] = !v[14];
    }

    let rounds = usize::try_from(rounds).unwrap_or(usize::MAX);
    for s in SIGMA.iter().cycle().take(rounds) {
        mix(&mut v, [0, 4, 8, 12], message[s[0]], message[s[1]]);
        mix(&mut v, [1, 5, 9, 13], message[s[2]], message[s[3]]);
        mix(&mut v, [2, 6, 10, 14], message[s[4]], message[s[5]]);
        mix(&mut v, [3, 7, 11, 15], message[s[6]], message[s[7]]);
        mix(&mut v, [0, 5, 10, 15], message[s[8]], message[s[9]]);
        mix(&mut v, [1, 6, 11, 12], message[s[10]], message[s[11]]);
        mix(&mut v, [2, 7, 8, 13], message[s[12]], message[s[13]]);
        mix(&mut v, [3, 4, 9, 14], message[s[14]], message[s[15]]);
    }

    let (low, high) = v.split_at(8);
    for ((word, low), high) in state.iter_mut().zip(low).zip(high) {
        *word ^= low ^ high;
    }
}

#[allow(clippy::indexing_slicing, reason = "all indices are below 16")]
fn mix(v: &mut [u64; 16], [a, b, c, d]: [usize; 4], x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn run(address: Address, input: &[u8], gas: u64) -> (Result<Bytes, ExceptionalHalt>, u64) {
        let mut gas_remaining = gas;
        let result = execute_precompile(&address, input, &mut gas_remaining, Revision::Cancun)
            .expect("precompile exists");
        (result, gas_remaining)
    }

    const SIGNED: [u8; 128] = hex!(
        "38d18acb67d25c8bb9942764b62f18e17054f66a817bd4295423adf9ed98873e"
        "000000000000000000000000000000000000000000000000000000000000001b"
        "38d18acb67d25c8bb9942764b62f18e17054f66a817bd4295423adf9ed98873e"
        "789d1dd423d25f0772d2748d60f7e4b81bb14d086eba8e8e8efb6dcff8a4ae02"
    );
    const SIGNER: [u8; 32] =
        hex!("000000000000000000000000ceaccac640adf55b2028469bd36ba501f28b699d");

    #[test]
    fn ecrecover_returns_the_signer() {
        let (output, gas_left) = run(ECRECOVER_ADDRESS, &SIGNED, 5000);
        assert_eq!(output.unwrap().as_ref(), SIGNER);
        assert_eq!(gas_left, 2000);

        // Same signature with s negated and v flipped.
        let mut high_s = SIGNED;
        high_s[63] = 0x1c;
        high_s[96..].copy_from_slice(&hex!(
            "8762e22bdc2da0f88d2d8b729f081b469efd8fde408e11ad30d6f0bcd791933f"
        ));
        assert_eq!(run(ECRECOVER_ADDRESS, &high_s, 5000).0.unwrap().as_ref(), SIGNER);
    }

    #[test]
    fn ecrecover_rejects_bad_signatures_softly() {
        let mut bad_v = SIGNED;
        bad_v[63] = 0x1d;
        let mut v_not_a_byte = SIGNED;
        v_not_a_byte[32] = 1;
        let mut zero_r = SIGNED;
        zero_r[64..96].fill(0);

        for input in [&bad_v[..], &v_not_a_byte[..], &zero_r[..], &[0u8; 0][..]] {
            let (output, gas_left) = run(ECRECOVER_ADDRESS, input, 3000);
            assert!(output.unwrap().is_empty());
            assert_eq!(gas_left, 0);
        }
        assert_eq!(
            run(ECRECOVER_ADDRESS, &SIGNED, 2999).0,
            Err(ExceptionalHalt::OutOfGas)
        );
    }

    #[test]
    fn hashes_and_identity() {
        let (identity, gas_left) = run(IDENTITY_ADDRESS, b"abc", 100);
        assert_eq!(identity.unwrap().as_ref(), b"abc");
        assert_eq!(gas_left, 100 - 18);

        let (sha, _) = run(SHA2_256_ADDRESS, b"", 100);
        assert_eq!(
            sha.unwrap().as_ref(),
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );

        let (ripemd, gas_left) = run(RIPEMD_160_ADDRESS, b"", 600);
        assert_eq!(
            ripemd.unwrap().as_ref(),
            hex!("0000000000000000000000009c1185a5c5e9fc54612808977ee8f548b2258d31")
        );
        assert_eq!(gas_left, 0);

        assert_eq!(run(SHA2_256_ADDRESS, b"", 59).0, Err(ExceptionalHalt::OutOfGas));
    }

    fn modexp_input(base: &[u8], exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
        let mut input = Vec::new();
        for part in [base, exponent, modulus] {
            input.extend_from_slice(&U256::from(part.len()).to_big_endian());
        }
        for part in [base, exponent, modulus] {
            input.extend_from_slice(part);
        }
        input
    }

    #[test]
    fn modexp_computes_and_pads_to_the_modulus() {
        // 2^10 % 1000
        let input = modexp_input(&[2], &[10], &[0x03, 0xe8]);
        let (output, gas_left) = run(MODEXP_ADDRESS, &input, 1000);
        assert_eq!(output.unwrap().as_ref(), [0x00, 0x18]);
        assert_eq!(gas_left, 1000 - MODEXP_MIN_COST);

        let zero_modulus = modexp_input(&[2], &[10], &[0, 0]);
        assert_eq!(run(MODEXP_ADDRESS, &zero_modulus, 1000).0.unwrap().as_ref(), [0, 0]);

        let zero_exponent = modexp_input(&[2], &[], &[1]);
        assert_eq!(run(MODEXP_ADDRESS, &zero_exponent, 1000).0.unwrap().as_ref(), [0]);

        let no_modulus = modexp_input(&[2], &[10], &[]);
        assert!(run(MODEXP_ADDRESS, &no_modulus, 1000).0.unwrap().is_empty());

        assert_eq!(run(MODEXP_ADDRESS, &input, 199).0, Err(ExceptionalHalt::OutOfGas));
    }

    #[test]
    fn modexp_pricing_per_revision() {
        // Fermat: 3^(p-1) % p with the secp256k1 field prime.
        let prime = hex!("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f");
        let exponent = hex!("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2e");
        let input = modexp_input(&[3], &exponent, &prime);
        let head = U256::from_big_endian(&exponent);
        let len = |n: usize| U256::from(n);

        assert_eq!(modexp_cost(len(1), len(32), len(32), head, Revision::Byzantium), 13056);
        assert_eq!(modexp_cost(len(1), len(32), len(32), head, Revision::Berlin), 1360);

        let mut gas_remaining = 20_000;
        let output = execute_precompile(&MODEXP_ADDRESS, &input, &mut gas_remaining, Revision::Byzantium)
            .unwrap()
            .unwrap();
        assert_eq!(output.as_ref(), U256::one().to_big_endian());
        assert_eq!(gas_remaining, 20_000 - 13056);

        // Huge lengths are priced, not allocated.
        assert_eq!(modexp_cost(U256::MAX, len(0), len(1), U256::zero(), Revision::Cancun), u64::MAX);
        let mut huge_exponent = modexp_input(&[], &[], &[]);
        huge_exponent[32..64].copy_from_slice(&U256::MAX.to_big_endian());
        assert!(run(MODEXP_ADDRESS, &huge_exponent, 1000).0.unwrap().is_empty());
    }

    fn blake2f_input(rounds: u32, last_block: u8) -> Vec<u8> {
        let mut input = rounds.to_be_bytes().to_vec();
        input.extend_from_slice(&hex!(
            "48c9bdf267e6096a3ba7ca8485ae67bb2bf894fe72f36e3cf1361d5f3af54fa5"
            "d182e6ad7f520e511f6c3e2b8c68059b6bbd41fbabd9831f79217e1319cde05b"
        ));
        let mut message = [0u8; 128];
        message[..3].copy_from_slice(b"abc");
        input.extend_from_slice(&message);
        let mut offsets = [0u8; 16];
        offsets[0] = 3;
        input.extend_from_slice(&offsets);
        input.push(last_block);
        input
    }

    #[test]
    fn blake2f_compresses() {
        let (output, gas_left) = run(BLAKE2F_ADDRESS, &blake2f_input(12, 1), 20);
        assert_eq!(
            output.unwrap().as_ref(),
            hex!(
                "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1"
                "7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
            )
        );
        assert_eq!(gas_left, 8);

        let (output, _) = run(BLAKE2F_ADDRESS, &blake2f_input(0, 1), 0);
        assert_eq!(
            output.unwrap().as_ref(),
            hex!(
                "08c9bcf367e6096a3ba7ca8485ae67bb2bf894fe72f36e3cf1361d5f3af54fa5"
                "d282e6ad7f520e511f6c3e2b8c68059b9442be0454267ce079217e1319cde05b"
            )
        );
    }

    #[test]
    fn blake2f_rejects_malformed_input() {
        let mut short = blake2f_input(12, 1);
        short.pop();
        assert_eq!(run(BLAKE2F_ADDRESS, &short, 100).0, Err(ExceptionalHalt::PrecompileFailure));
        assert_eq!(
            run(BLAKE2F_ADDRESS, &blake2f_input(12, 2), 100).0,
            Err(ExceptionalHalt::PrecompileFailure)
        );
        assert_eq!(run(BLAKE2F_ADDRESS, &blake2f_input(12, 0), 11).0, Err(ExceptionalHalt::OutOfGas));
    }

    #[test]
    fn availability_follows_revision() {
        assert!(is_precompile(&ECRECOVER_ADDRESS, Revision::Frontier));
        assert!(!is_precompile(&MODEXP_ADDRESS, Revision::SpuriousDragon));
        assert!(is_precompile(&MODEXP_ADDRESS, Revision::Byzantium));
        assert!(!is_precompile(&BLAKE2F_ADDRESS, Revision::Constantinople));
        assert!(is_precompile(&BLAKE2F_ADDRESS, Revision::Istanbul));
        assert!(!is_precompile(&precompile_address(0x06), Revision::Cancun));
    }
}
