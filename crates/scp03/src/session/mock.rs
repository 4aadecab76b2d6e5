//! Card-side (server) symmetric operations, gated behind the `mock`
//! feature. This is test/emulator tooling for exercising a client
//! `Session` end-to-end without real hardware — not an applet
//! implementation — in the same spirit as a `#[cfg(feature = "mockhsm")]`
//! card-emulation path.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::wrap::{unwrap_apdu_server, wrap_response_server};
use super::Inner;
use crate::config::{SecurityLevel, SessionConfig};
use crate::constants::{
    DDC_CARD_CRYPTOGRAM, DDC_HOST_CRYPTOGRAM, DDC_S_ENC, DDC_S_MAC, DDC_S_RMAC, SCP_IDENTIFIER,
};
use crate::crypto::cmac::aes_cmac;
use crate::crypto::kdf::kdf;
use crate::error::{AuthError, Error, StateError};
use crate::keys::StaticKeySet;

/// A minimal card-side counterpart to a client [`Session`](super::Session),
/// for use in tests. Tracks the same counters and chaining value a real
/// security domain would.
pub struct MockCard {
    inner: Inner,
    host_cryptogram: Option<[u8; 8]>,
}

impl MockCard {
    /// Build a card-side state from the same static keys and parameters a
    /// client would use.
    pub fn new(keys: StaticKeySet, config: SessionConfig) -> Self {
        Self {
            inner: Inner::new(keys, config),
            host_cryptogram: None,
        }
    }

    /// Build the INITIALIZE UPDATE response for a given `host_challenge`
    /// and `card_challenge`, deriving session keys identically to a real
    /// card.
    pub fn respond_to_init_update(
        &mut self,
        host_challenge: [u8; 8],
        card_challenge: [u8; 8],
    ) -> Result<Vec<u8>, Error> {
        let mut context = Vec::with_capacity(16);
        context.extend_from_slice(&host_challenge);
        context.extend_from_slice(&card_challenge);

        let s_enc = kdf(
            self.inner.keys.enc(),
            DDC_S_ENC,
            8 * self.inner.keys.enc().len() as u16,
            &context,
        )?;
        let s_mac = kdf(
            self.inner.keys.mac(),
            DDC_S_MAC,
            8 * self.inner.keys.mac().len() as u16,
            &context,
        )?;
        let s_rmac = kdf(
            self.inner.keys.mac(),
            DDC_S_RMAC,
            8 * self.inner.keys.mac().len() as u16,
            &context,
        )?;
        let card_cryptogram: [u8; 8] = kdf(&s_mac, DDC_CARD_CRYPTOGRAM, 64, &context)?
            .try_into()
            .expect("KDF with L=64 always yields 8 bytes");
        let host_cryptogram: [u8; 8] = kdf(&s_mac, DDC_HOST_CRYPTOGRAM, 64, &context)?
            .try_into()
            .expect("KDF with L=64 always yields 8 bytes");

        self.inner.s_enc = Some(Zeroizing::new(s_enc));
        self.inner.s_mac = Some(Zeroizing::new(s_mac));
        self.inner.s_rmac = Some(Zeroizing::new(s_rmac));
        self.inner.mac_chain = None;

        let i = self.inner.config.i();
        let mut resp = Vec::with_capacity(32);
        resp.extend_from_slice(self.inner.config.diver_data());
        resp.push(self.inner.keys.key_version());
        resp.push(SCP_IDENTIFIER);
        resp.push(i.raw());
        resp.extend_from_slice(&card_challenge);
        resp.extend_from_slice(&card_cryptogram);
        if i.pseudo_random_challenge() {
            resp.extend_from_slice(&self.inner.config.seq_counter().to_be_bytes()[1..]);
        }

        self.host_cryptogram = Some(host_cryptogram);
        Ok(resp)
    }

    /// Verify a client's EXTERNAL AUTHENTICATE command, installing `SL` on
    /// success.
    pub fn verify_ext_auth(&mut self, apdu: &[u8]) -> Result<(), Error> {
        if apdu.len() != 5 + 16 {
            return Err(StateError::OutOfOrder("malformed EXTERNAL AUTHENTICATE length").into());
        }
        let sl = SecurityLevel::new(apdu[2])?;
        let host_cryptogram = &apdu[5..13];
        let received_mac = &apdu[13..21];

        let expected_host_cryptogram = self
            .host_cryptogram
            .ok_or(StateError::OutOfOrder("verify_ext_auth called before init_update"))?;
        if !bool::from(expected_host_cryptogram.ct_eq(host_cryptogram)) {
            return Err(AuthError::CardCryptogramMismatch.into());
        }

        let s_mac = self
            .inner
            .s_mac
            .as_ref()
            .ok_or(StateError::OutOfOrder("verify_ext_auth called before keys were derived"))?;
        let mut data_to_sign = Vec::with_capacity(16 + 5 + 8);
        data_to_sign.extend_from_slice(&[0u8; 16]);
        data_to_sign.extend_from_slice(&[0x84, apdu[1], sl.raw(), 0x00, 0x10]);
        data_to_sign.extend_from_slice(host_cryptogram);
        let expected_mac = aes_cmac(s_mac, &data_to_sign)?;

        if !bool::from(expected_mac[..8].ct_eq(received_mac)) {
            return Err(AuthError::CMacMismatch.into());
        }

        self.inner.mac_chain = Some(expected_mac);
        self.inner.sl = sl;
        self.inner.rmac_sl = SecurityLevel::NONE;
        self.inner.cmd_count = 0;
        Ok(())
    }

    /// Verify and strip protection from a client-wrapped command APDU,
    /// returning the original cleartext.
    pub fn unwrap_command(&mut self, apdu: &[u8]) -> Result<Vec<u8>, Error> {
        unwrap_apdu_server(&mut self.inner, apdu)
    }

    /// Wrap a response the way a real card would, for a client to unwrap.
    pub fn wrap_response(&mut self, resp: &[u8], sw1: u8, sw2: u8) -> Result<Vec<u8>, Error> {
        wrap_response_server(&mut self.inner, resp, sw1, sw2)
    }
}
