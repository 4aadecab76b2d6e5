//! The Data Encryption Key: an out-of-band AES cipher for protecting
//! sensitive payloads (e.g. personalization data), independent of session
//! state.

use zeroize::Zeroizing;

use super::block::{cbc_decrypt_raw, cbc_encrypt_padded};
use crate::error::{BoundsError, Error};

const ZERO_IV: [u8; 16] = [0u8; 16];

/// AES-CBC, zero IV, ISO/IEC 7816-4 padding applied unconditionally on
/// encrypt. This crate always pads — see the DEK padding note in
/// `DESIGN.md` for why the source's "pad only if misaligned" behavior is
/// not reproduced.
pub struct Dek {
    key: Zeroizing<Vec<u8>>,
}

impl Dek {
    pub(crate) fn new(key: &[u8]) -> Self {
        Self {
            key: Zeroizing::new(key.to_vec()),
        }
    }

    /// Pad with `0x80` then zeros to the next 16-byte boundary — always,
    /// even if `data` is already block-aligned — then encrypt.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        cbc_encrypt_padded(&self.key, &ZERO_IV, data)
    }

    /// Decrypt `data`, which must be a non-zero multiple of 16 bytes.
    /// Returns raw plaintext; any `0x80…00` padding is left in place for
    /// the caller to strip, matching the reference's DEK behavior.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        if data.is_empty() || data.len() % 16 != 0 {
            return Err(BoundsError::InvalidCiphertextLength(data.len()).into());
        }
        cbc_decrypt_raw(&self.key, &ZERO_IV, data)
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dek").finish_non_exhaustive()
    }
}
