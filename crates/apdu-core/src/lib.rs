//! Transport-agnostic ISO/IEC 7816-4 APDU primitives.
//!
//! This crate provides the minimal set of types a secure-channel
//! implementation needs from the surrounding world: a byte-level
//! `Command`/`Response` representation and a `CardTransport` trait
//! describing the only operation the channel requires of a reader or
//! connector — sending raw bytes and getting raw bytes back.
//!
//! Building the transport itself (PC/SC, USB, a mock card) is left to
//! callers; this crate only defines the boundary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod response;
mod transport;

pub use command::Command;
pub use error::Error;
pub use response::{Response, StatusWord};
pub use transport::CardTransport;

/// Result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;
