//! Static, long-term key material.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ConfigError, Error};

fn check_key_length(what: &'static str, key: &[u8]) -> Result<(), Error> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        actual => Err(ConfigError::InvalidKeyLength { what, actual }.into()),
    }
}

/// The three long-term AES keys provisioned on a security domain — ENC,
/// MAC, and DEK — plus the key version byte that identifies them. Each key
/// may independently be AES-128, -192, or -256. Immutable once constructed;
/// zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StaticKeySet {
    enc: Vec<u8>,
    mac: Vec<u8>,
    dek: Vec<u8>,
    #[zeroize(skip)]
    key_version: u8,
}

impl StaticKeySet {
    /// Build a key set, validating that each key is 16, 24, or 32 bytes.
    pub fn new(enc: &[u8], mac: &[u8], dek: &[u8], key_version: u8) -> Result<Self, Error> {
        check_key_length("ENC key", enc)?;
        check_key_length("MAC key", mac)?;
        check_key_length("DEK key", dek)?;
        Ok(Self {
            enc: enc.to_vec(),
            mac: mac.to_vec(),
            dek: dek.to_vec(),
            key_version,
        })
    }

    /// The static ENC key.
    pub fn enc(&self) -> &[u8] {
        &self.enc
    }

    /// The static MAC key.
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }

    /// The static DEK key.
    pub fn dek(&self) -> &[u8] {
        &self.dek
    }

    /// The key version byte identifying this key set on the card.
    pub const fn key_version(&self) -> u8 {
        self.key_version
    }
}

impl std::fmt::Debug for StaticKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeySet")
            .field("key_version", &self.key_version)
            .finish_non_exhaustive()
    }
}
