//! Response APDU representation.

use bytes::Bytes;

use crate::{Error, Result};

/// The two status bytes (SW1, SW2) that trail every response APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u8, pub u8);

impl StatusWord {
    /// `9000` — normal processing, no further qualification.
    pub const OK: Self = Self(0x90, 0x00);

    /// Build a status word from its two bytes.
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self(sw1, sw2)
    }

    /// `true` for `9000`.
    pub const fn is_success(self) -> bool {
        self.0 == 0x90 && self.1 == 0x00
    }

    /// `true` for `61xx` — more response data is available via GET RESPONSE.
    pub const fn has_more_data(self) -> bool {
        self.0 == 0x61
    }

    /// `true` for `6Cxx` — reissue the command with SW2 as the correct Le.
    pub const fn wrong_le(self) -> bool {
        self.0 == 0x6C
    }

    /// Combine the two bytes into the conventional 16-bit value, e.g. `0x9000`.
    pub const fn as_u16(self) -> u16 {
        ((self.0 as u16) << 8) | self.1 as u16
    }
}

/// A response APDU: trailing data followed by a status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Build a response from its parts.
    pub fn new(payload: impl Into<Bytes>, status: StatusWord) -> Self {
        Self {
            payload: payload.into(),
            status,
        }
    }

    /// Response data, excluding the trailing status word.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The trailing status word.
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// `true` when [`status`](Self::status) is `9000`.
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Split a raw response APDU into payload and status word.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::Parse("response shorter than the 2-byte status word"));
        }

        let (payload, sw) = raw.split_at(raw.len() - 2);
        Ok(Self::new(payload.to_vec(), StatusWord::new(sw[0], sw[1])))
    }

    /// Serialize back to raw bytes (payload followed by SW1 SW2).
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = Vec::with_capacity(self.payload.len() + 2);
        buffer.extend_from_slice(&self.payload);
        buffer.push(self.status.0);
        buffer.push(self.status.1);
        buffer.into()
    }
}
