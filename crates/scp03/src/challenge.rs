//! Fixed-size challenge and cryptogram values exchanged during the
//! handshake. All compare in constant time and zeroize on drop.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

macro_rules! fixed_bytes {
    ($name:ident, $len:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Wrap raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Borrow the underlying bytes.
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = crate::error::Error;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                let array: [u8; $len] =
                    bytes
                        .try_into()
                        .map_err(|_| crate::error::ProtocolError::UnexpectedLength {
                            expected: concat!(stringify!($len), " bytes"),
                            actual: bytes.len(),
                        })?;
                Ok(Self(array))
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.ct_eq(&other.0).into()
            }
        }
        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&"..").finish()
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.0.zeroize();
            }
        }
    };
}

fixed_bytes!(
    HostChallenge,
    8,
    "The 8-byte host challenge generated for INITIALIZE UPDATE."
);
impl HostChallenge {
    /// Draw a fresh random challenge from the OS CSPRNG.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 8];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

fixed_bytes!(
    CardChallenge,
    8,
    "The 8-byte card challenge returned by INITIALIZE UPDATE."
);
fixed_bytes!(
    Cryptogram,
    8,
    "An 8-byte KDF-derived cryptogram proving possession of a session key."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_challenges_compare_equal() {
        let a = HostChallenge::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let b = HostChallenge::new([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(a, b);
    }

    #[test]
    fn unequal_cryptograms_compare_unequal() {
        let a = Cryptogram::new([0; 8]);
        let b = Cryptogram::new([1; 8]);
        assert_ne!(a, b);
    }

    #[test]
    fn debug_does_not_print_bytes() {
        let c = CardChallenge::new([0xAA; 8]);
        assert!(!format!("{c:?}").contains("170"));
    }

    #[test]
    fn try_from_rejects_wrong_length() {
        assert!(HostChallenge::try_from(&[0u8; 7][..]).is_err());
    }

    #[test]
    fn random_challenges_are_not_all_zero_and_differ() {
        let a = HostChallenge::random();
        let b = HostChallenge::random();
        assert_ne!(a.as_bytes(), &[0u8; 8]);
        assert_ne!(a, b);
    }
}
