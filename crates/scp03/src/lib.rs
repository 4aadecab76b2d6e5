//! Client-side core of GlobalPlatform Secure Channel Protocol 03
//! (Amendment D to GlobalPlatform Card Specification v2.2.1).
//!
//! This crate implements the cryptographic primitives, handshake logic,
//! and APDU wrap/unwrap pipeline of SCP03 as a typestate session over a
//! [`CardTransport`](gp_apdu_core::CardTransport). It does not talk to a
//! reader, does not perform PC/SC connector discovery, and does not
//! decide *when* to authenticate — callers drive the handshake and pass
//! the resulting command/response bytes through whatever transport they
//! have.
//!
//! The [`transport`] module layers a thin decorator on top of a raw
//! [`CardTransport`](gp_apdu_core::CardTransport) that drives the
//! handshake and the wrap/unwrap pipeline automatically; the [`session`]
//! module exposes the lower-level typestate API directly for callers who
//! want to drive the protocol by hand (e.g. across an async transport, or
//! one this crate has no decorator for).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod challenge;
pub mod cla;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod session;
pub mod transport;

pub use challenge::{CardChallenge, Cryptogram, HostChallenge};
pub use config::{ScpParameter, SecurityLevel, SessionConfig};
pub use crypto::Dek;
pub use error::Error;
pub use keys::StaticKeySet;
pub use session::{Authenticated, Configured, KeysDerived, RMacActive, Session};
pub use transport::SecureChannel;

/// Result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;
