//! Error types, one kind per failure category, so a caller can dispatch on
//! the *kind* of failure — enforcing a lockout policy on [`AuthError`] is a
//! very different decision than retrying a [`TransportError`].

use thiserror::Error;

/// Top-level error returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid static configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A received message didn't match the expected wire layout.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A cryptogram or MAC failed verification.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// An operation was invoked in the wrong session phase.
    #[error(transparent)]
    State(#[from] StateError),

    /// A length or arithmetic bound was exceeded.
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    /// The transport collaborator failed, or the card returned a fatal
    /// status word.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Invalid static parameters: wrong key length, invalid `i`, AID out of
/// range, SL not in the permitted set, sequence-counter overflow.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A fixed-size field (AID, logical channel, ...) had the wrong length.
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Which field failed validation.
        what: &'static str,
        /// The length that was required.
        expected: &'static str,
        /// The length actually supplied.
        actual: usize,
    },

    /// An AES key was not 16, 24, or 32 bytes.
    #[error("invalid {what} length: {actual} bytes (must be 16, 24, or 32)")]
    InvalidKeyLength {
        /// Which key failed validation.
        what: &'static str,
        /// The length actually supplied.
        actual: usize,
    },

    /// SCP03 parameter `i` carried an illegal bit combination.
    #[error("invalid SCP03 parameter i=0x{0:02X}")]
    InvalidParameterI(u8),

    /// A requested security level is not in the accepted set.
    #[error("security level 0x{0:02X} is not a legal SL value")]
    InvalidSecurityLevel(u8),

    /// The sequence counter exceeds its 24-bit range.
    #[error("sequence counter 0x{0:08X} exceeds 24 bits")]
    SeqCounterOverflow(u32),

    /// A requested KDF output length can't be represented: not a multiple
    /// of 8, or would require more than 255 block invocations.
    #[error("KDF output length {0} bits is not a multiple of 8, or needs more than 255 blocks")]
    InvalidKdfLength(u16),
}

/// A parsed message didn't match the expected wire layout.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A field had a length outside what the layout allows.
    #[error("expected {expected}, got {actual} bytes")]
    UnexpectedLength {
        /// What was expected.
        expected: &'static str,
        /// What was found.
        actual: usize,
    },

    /// The SCP version byte in an INITIALIZE UPDATE response was not 0x03.
    #[error("unsupported SCP version 0x{0:02X} (expected 0x03)")]
    UnsupportedScpVersion(u8),

    /// `seq_counter` was present/absent in a way that contradicts `i`.
    #[error("sequence counter presence does not match parameter i")]
    SeqCounterPresence,

    /// Padding on decrypted data was malformed.
    #[error("padding is malformed")]
    Padding,

    /// A catch-all for layout violations with a fixed, descriptive message.
    #[error("{0}")]
    Malformed(&'static str),
}

/// A cryptogram or MAC failed verification. Distinct from [`ProtocolError`]
/// so callers can apply a lockout policy specifically to authentication
/// failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The card's cryptogram did not match the host-computed expectation.
    #[error("card cryptogram does not match the expected value")]
    CardCryptogramMismatch,

    /// C-MAC verification failed on an unwrapped command.
    #[error("C-MAC verification failed")]
    CMacMismatch,

    /// R-MAC verification failed on a response.
    #[error("R-MAC verification failed")]
    RMacMismatch,
}

/// An operation was invoked out of order for the session's current phase.
#[derive(Debug, Error)]
pub enum StateError {
    /// A fixed, descriptive message naming the operation and the missing
    /// precondition.
    #[error("{0}")]
    OutOfOrder(&'static str),

    /// The session suffered a MAC/cryptogram failure and must not be used
    /// again.
    #[error("session is poisoned after a previous authentication failure")]
    Poisoned,
}

/// A length or arithmetic bound was exceeded.
#[derive(Debug, Error)]
pub enum BoundsError {
    /// Lc after wrapping would exceed the short-form limit of 0xFF.
    #[error("Lc {0} exceeds the maximum short-form value of 0xFF")]
    LcOverflow(usize),

    /// An R-ENC response payload exceeded the 0xEF limit.
    #[error("R-ENC payload of {0} bytes exceeds the 0xEF limit")]
    REncPayloadTooLarge(usize),

    /// An R-MAC response payload exceeded the 0xF0 limit.
    #[error("R-MAC payload of {0} bytes exceeds the 0xF0 limit")]
    RMacPayloadTooLarge(usize),

    /// `cmd_count` exhausted its 64-bit range.
    #[error("command counter exhausted its 64-bit range")]
    CommandCounterOverflow,

    /// Ciphertext handed to a block-cipher decrypt operation was empty or
    /// not a multiple of the 16-byte block size.
    #[error("ciphertext length {0} is not a non-zero multiple of 16")]
    InvalidCiphertextLength(usize),
}

/// Surfaced verbatim from the transport collaborator, or raised when a
/// status word outside `9000`/`61xx`/`6Cxx` is treated as fatal for the
/// current command.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport collaborator itself failed (I/O, reader error, ...).
    #[error("transport failed: {0}")]
    Io(String),

    /// The card returned a status word the core treats as fatal.
    #[error("card returned fatal status word {sw1:02X}{sw2:02X}")]
    FatalStatus {
        /// SW1.
        sw1: u8,
        /// SW2.
        sw2: u8,
    },
}

impl From<gp_apdu_core::Error> for Error {
    fn from(err: gp_apdu_core::Error) -> Self {
        Self::Transport(TransportError::Io(err.to_string()))
    }
}
