//! Error type for the transport boundary.

/// Errors surfaced by a [`CardTransport`](crate::CardTransport) or while
/// parsing raw APDU bytes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport failed to deliver or receive bytes.
    #[error("transmission failure: {0}")]
    Transmission(String),

    /// Raw bytes did not parse as a well-formed command or response.
    #[error("parse error: {0}")]
    Parse(&'static str),
}
