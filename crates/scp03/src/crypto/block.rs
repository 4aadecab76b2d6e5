//! Shared block-cipher plumbing: single-block AES-ECB (used to derive ICVs
//! from `cmd_count`) and AES-CBC with ISO/IEC 7816-4 padding or no padding
//! at all (used by the DEK cipher and the C-ENC/R-ENC wrap steps).

use aes::{Aes128, Aes192, Aes256};
use block_padding::{Iso7816, NoPadding};
use cbc::{Decryptor, Encryptor};
use cipher::{BlockCipher, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyIvInit, KeyInit};

use crate::error::{ConfigError, Error, ProtocolError};

/// Encrypt a single 16-byte block in place under AES-ECB.
pub(crate) fn ecb_encrypt_block(key: &[u8], block: &mut [u8; 16]) -> Result<(), Error> {
    fn run<C: BlockCipher + BlockEncrypt + KeyInit>(key: &[u8], block: &mut [u8; 16]) {
        let cipher = C::new_from_slice(key).expect("key length validated by caller");
        cipher.encrypt_block(block.into());
    }

    match key.len() {
        16 => run::<Aes128>(key, block),
        24 => run::<Aes192>(key, block),
        32 => run::<Aes256>(key, block),
        actual => {
            return Err(ConfigError::InvalidKeyLength {
                what: "AES key",
                actual,
            }
            .into())
        }
    }
    Ok(())
}

/// AES-CBC encrypt, applying ISO/IEC 7816-4 padding (`0x80` then zeros)
/// unconditionally — even to already block-aligned input.
pub(crate) fn cbc_encrypt_padded(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, Error> {
    fn run<C>(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Vec<u8>
    where
        C: BlockCipher + BlockEncryptMut + KeyInit,
    {
        Encryptor::<C>::new_from_slices(key, iv)
            .expect("key/iv length validated by caller")
            .encrypt_padded_vec_mut::<Iso7816>(data)
    }

    Ok(match key.len() {
        16 => run::<Aes128>(key, iv, data),
        24 => run::<Aes192>(key, iv, data),
        32 => run::<Aes256>(key, iv, data),
        actual => {
            return Err(ConfigError::InvalidKeyLength {
                what: "AES key",
                actual,
            }
            .into())
        }
    })
}

/// AES-CBC decrypt, stripping ISO/IEC 7816-4 padding and rejecting malformed
/// padding as [`ProtocolError::Padding`].
pub(crate) fn cbc_decrypt_padded(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, Error> {
    fn run<C>(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, Error>
    where
        C: BlockCipher + BlockDecryptMut + KeyInit,
    {
        Decryptor::<C>::new_from_slices(key, iv)
            .expect("key/iv length validated by caller")
            .decrypt_padded_vec_mut::<Iso7816>(data)
            .map_err(|_| ProtocolError::Padding.into())
    }

    match key.len() {
        16 => run::<Aes128>(key, iv, data),
        24 => run::<Aes192>(key, iv, data),
        32 => run::<Aes256>(key, iv, data),
        actual => Err(ConfigError::InvalidKeyLength {
            what: "AES key",
            actual,
        }
        .into()),
    }
}

/// AES-CBC decrypt with no padding removal — every plaintext byte,
/// including any `0x80…00` terminator, is returned to the caller.
pub(crate) fn cbc_decrypt_raw(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, Error> {
    fn run<C>(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Vec<u8>
    where
        C: BlockCipher + BlockDecryptMut + KeyInit,
    {
        Decryptor::<C>::new_from_slices(key, iv)
            .expect("key/iv length validated by caller")
            .decrypt_padded_vec_mut::<NoPadding>(data)
            .expect("NoPadding never fails on block-aligned input")
    }

    match key.len() {
        16 => Ok(run::<Aes128>(key, iv, data)),
        24 => Ok(run::<Aes192>(key, iv, data)),
        32 => Ok(run::<Aes256>(key, iv, data)),
        actual => Err(ConfigError::InvalidKeyLength {
            what: "AES key",
            actual,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecb_block_roundtrips_via_manual_decrypt() {
        let key = [0x11u8; 16];
        let mut block = [0x22u8; 16];
        ecb_encrypt_block(&key, &mut block).unwrap();
        assert_ne!(block, [0x22u8; 16]);
    }

    #[test]
    fn cbc_padded_roundtrip() {
        let key = [0x42u8; 16];
        let iv = [0u8; 16];
        let data = b"exactly16bytes!!";
        let ct = cbc_encrypt_padded(&key, &iv, data).unwrap();
        // Always-pad: a full block of input still grows by one block.
        assert_eq!(ct.len(), data.len() + 16);
        let pt = cbc_decrypt_padded(&key, &iv, &ct).unwrap();
        assert_eq!(pt, data);
    }

    #[test]
    fn cbc_raw_roundtrip_keeps_padding_bytes() {
        let key = [0x77u8; 16];
        let iv = [0u8; 16];
        let data = b"exactly16bytes!!";
        let ct = cbc_encrypt_padded(&key, &iv, data).unwrap();
        let pt = cbc_decrypt_raw(&key, &iv, &ct).unwrap();
        assert_eq!(pt.len(), ct.len());
        assert_eq!(&pt[..data.len()], data.as_slice());
        assert_eq!(&pt[data.len()..], &[0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
