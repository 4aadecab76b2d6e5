//! AES primitives shared by the KDF, handshake, and wrap pipeline: one-shot
//! CMAC, the Amendment-D KDF, and the block-cipher plumbing (ECB for ICV
//! derivation, CBC with ISO/IEC 7816-4 padding for DEK/C-ENC/R-ENC).

pub mod block;
pub mod cmac;
pub mod dek;
pub mod kdf;

pub use dek::Dek;
