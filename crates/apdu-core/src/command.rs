//! APDU command representation (ISO/IEC 7816-4, short length fields only).

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// A command APDU: `CLA INS P1 P2 [Lc data] [Le]`.
///
/// Only the short (single-byte Lc/Le) form is supported, which is all the
/// SCP03 core ever emits or expects back from a wrapped security domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Bytes>,
    le: Option<u8>,
}

impl Command {
    /// Build a command with no data and no expected length.
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Build a command carrying data.
    pub fn with_data(cla: u8, ins: u8, p1: u8, p2: u8, data: impl Into<Bytes>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Set the expected response length (Le).
    #[must_use]
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command class (CLA).
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS).
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter (P1).
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter (P2).
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Command data, if any.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Expected response length (Le), if any.
    pub const fn le(&self) -> Option<u8> {
        self.le
    }

    /// Serialize to raw APDU bytes.
    pub fn to_bytes(&self) -> Bytes {
        let data_len = self.data.as_ref().map_or(0, Bytes::len);
        let mut capacity = 4;
        if self.data.is_some() {
            capacity += 1 + data_len;
        }
        if self.le.is_some() {
            capacity += 1;
        }

        let mut buffer = BytesMut::with_capacity(capacity);
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(data) = &self.data {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }

    /// Parse a raw short-form APDU.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < 4 {
            return Err(Error::Parse("APDU shorter than the 4-byte header"));
        }

        let (cla, ins, p1, p2) = (raw[0], raw[1], raw[2], raw[3]);
        let rest = &raw[4..];

        Ok(match rest.len() {
            0 => Self::new(cla, ins, p1, p2),
            1 => Self::new(cla, ins, p1, p2).with_le(rest[0]),
            _ => {
                let lc = rest[0] as usize;
                let body = &rest[1..];
                if body.len() == lc {
                    Self::with_data(cla, ins, p1, p2, body.to_vec())
                } else if body.len() == lc + 1 {
                    Self::with_data(cla, ins, p1, p2, body[..lc].to_vec())
                        .with_le(body[lc])
                } else {
                    return Err(Error::Parse("Lc does not match remaining data length"));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex::decode as hex_decode;

    #[test]
    fn roundtrip_case3() {
        let cmd = Command::with_data(0x80, 0x50, 0x30, 0x00, hex_decode("0807060504030201").unwrap());
        let bytes = cmd.to_bytes();
        assert_eq!(hex::encode(&bytes), "80503000080807060504030201");
        assert_eq!(Command::from_bytes(&bytes).unwrap(), cmd);
    }

    #[test]
    fn roundtrip_case2() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00).with_le(0);
        let bytes = cmd.to_bytes();
        assert_eq!(bytes.as_ref(), [0x00, 0xA4, 0x04, 0x00, 0x00]);
        assert_eq!(Command::from_bytes(&bytes).unwrap(), cmd);
    }

    #[test]
    fn rejects_short_header() {
        assert!(Command::from_bytes(&[0x00, 0xA4]).is_err());
    }
}
