//! The transport boundary.

use bytes::Bytes;

use crate::Result;

/// The only operation a secure channel requires of whatever moves bytes to
/// and from a card: send a raw command APDU, get a raw response APDU back.
///
/// Implementations (PC/SC, a USB CCID stack, an in-memory mock) live outside
/// this crate; it only defines the contract.
pub trait CardTransport {
    /// Send `command` and return the raw response APDU.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes>;

    /// Reset the underlying connection, if the transport supports it.
    ///
    /// The default implementation does nothing — most transports don't need
    /// an explicit reset between commands.
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}
