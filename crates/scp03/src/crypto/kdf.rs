//! The Amendment-D §4.1.5 counter-mode key derivation function, built on
//! [`aes_cmac`](super::cmac::aes_cmac).

use super::cmac::aes_cmac;
use crate::error::{ConfigError, Error};

/// Derive `l_bits` bits of key material from `key`, a 1-byte derivation
/// `constant`, and `context`.
///
/// For `i = 1, 2, …, ⌈L/128⌉` computes
/// `CMAC(key, 0x00^11 || constant || 0x00 || L_be16 || i || context)` and
/// concatenates the blocks, truncating the result to `l_bits / 8` bytes.
pub fn kdf(key: &[u8], constant: u8, l_bits: u16, context: &[u8]) -> Result<Vec<u8>, Error> {
    if l_bits % 8 != 0 {
        return Err(ConfigError::InvalidKdfLength(l_bits).into());
    }

    let l_bytes = usize::from(l_bits / 8);
    let block_count = usize::from(l_bits).div_ceil(128);
    if block_count == 0 || block_count > 255 {
        return Err(ConfigError::InvalidKdfLength(l_bits).into());
    }

    let mut output = Vec::with_capacity(block_count * 16);
    for counter in 1..=block_count {
        let mut data = Vec::with_capacity(11 + 1 + 1 + 2 + 1 + context.len());
        data.extend_from_slice(&[0u8; 11]);
        data.push(constant);
        data.push(0x00);
        data.extend_from_slice(&l_bits.to_be_bytes());
        data.push(counter as u8);
        data.extend_from_slice(context);

        output.extend_from_slice(&aes_cmac(key, &data)?);
    }

    output.truncate(l_bytes);
    Ok(output)
}
