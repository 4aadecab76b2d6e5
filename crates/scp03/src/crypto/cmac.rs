//! AES-CMAC per NIST SP 800-38B, dispatched across the three permitted AES
//! key sizes. Subkey generation, padding, and the GF(2^128) doubling step
//! are all handled by the `cmac`/`aes` crates rather than hand-rolled here.

use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockCipher, BlockEncrypt, KeyInit};

use crate::error::{ConfigError, Error};

/// Compute the 16-byte AES-CMAC tag of `message` under `key`.
///
/// `key` must be 16, 24, or 32 bytes (AES-128/192/256); anything else is a
/// configuration error rather than a panic.
pub fn aes_cmac(key: &[u8], message: &[u8]) -> Result<[u8; 16], Error> {
    match key.len() {
        16 => Ok(compute::<Aes128>(key, message)),
        24 => Ok(compute::<Aes192>(key, message)),
        32 => Ok(compute::<Aes256>(key, message)),
        actual => Err(ConfigError::InvalidKeyLength {
            what: "CMAC key",
            actual,
        }
        .into()),
    }
}

fn compute<C>(key: &[u8], message: &[u8]) -> [u8; 16]
where
    C: BlockCipher + BlockEncrypt + KeyInit,
{
    use ::cmac::{Cmac, Mac};

    let mut mac = Cmac::<C>::new_from_slice(key).expect("key length validated by caller");
    mac.update(message);
    mac.finalize().into_bytes().into()
}
