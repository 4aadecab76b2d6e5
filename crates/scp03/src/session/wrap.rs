//! The APDU wrap/unwrap pipeline: CLA rewriting, C-ENC, C-MAC chaining,
//! R-MAC verification, R-ENC decryption. Operates on
//! [`Inner`] directly so `Session<Authenticated>` and `Session<RMacActive>`
//! can share one implementation. Shaped after `SCP02Wrapper::wrap_command`
//! (holds key material + chaining value, mutates an ICV/counter, re-emits
//! a MAC'd command), generalized from 3DES/SCP02 to AES/SCP03's
//! counter-derived ICV.

use gp_apdu_core::Command;
use subtle::ConstantTimeEq;
use tracing::{trace, warn};

use super::Inner;
use crate::cla;
use crate::constants::{INS_GET_RESPONSE, MAX_RENC_PAYLOAD, MAX_RMAC_PAYLOAD};
use crate::crypto::block::{cbc_decrypt_padded, cbc_encrypt_padded, ecb_encrypt_block};
use crate::crypto::cmac::aes_cmac;
use crate::error::{AuthError, BoundsError, Error, ProtocolError, StateError};

/// Build the 16-byte ICV input: `cmd_count` as a big-endian 128-bit value,
/// optionally with bit 127 (the very first bit) set to distinguish response
/// ICVs from command ICVs sharing the same counter.
fn counter_block(cmd_count: u64, response: bool) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[8..].copy_from_slice(&cmd_count.to_be_bytes());
    if response {
        block[0] |= 0x80;
    }
    block
}

fn mac_chain_data(
    mac_chain: &[u8; 16],
    scla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    final_lc: u8,
    body: &[u8],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(16 + 5 + body.len());
    data.extend_from_slice(mac_chain);
    data.extend_from_slice(&[scla, ins, p1, p2, final_lc]);
    data.extend_from_slice(body);
    data
}

pub(crate) fn wrap_apdu(inner: &mut Inner, apdu: &[u8]) -> Result<Vec<u8>, Error> {
    if apdu.len() < 5 {
        return Err(ProtocolError::Malformed("apdu shorter than 5 bytes").into());
    }

    let cmd = Command::from_bytes(apdu)?;

    if cmd.instruction() == INS_GET_RESPONSE {
        return Ok(apdu.to_vec());
    }
    let ins_high_nibble = cmd.instruction() >> 4;
    if ins_high_nibble == 0x6 || ins_high_nibble == 0x9 {
        return Err(ProtocolError::Malformed(
            "INS high nibble collides with the status-word space",
        )
        .into());
    }

    inner.cmd_count = inner
        .cmd_count
        .checked_add(1)
        .ok_or(BoundsError::CommandCounterOverflow)?;
    trace!(cmd_count = inner.cmd_count, ins = cmd.instruction(), "wrapping command APDU");

    let scla = cla::neutralize(cmd.class());
    let channel = cla::channel(cmd.class());
    let mut data = cmd.data().unwrap_or(&[]).to_vec();

    if inner.sl.c_enc() && !data.is_empty() {
        let s_enc = inner
            .s_enc
            .as_ref()
            .ok_or(StateError::OutOfOrder("C-ENC requested before keys were derived"))?;
        let mut icv = counter_block(inner.cmd_count, false);
        ecb_encrypt_block(s_enc, &mut icv)?;
        data = cbc_encrypt_padded(s_enc, &icv, &data)?;
    }

    if inner.sl.c_mac() {
        let s_mac = inner
            .s_mac
            .as_ref()
            .ok_or(StateError::OutOfOrder("C-MAC requested before keys were derived"))?;
        let mac_chain = inner
            .mac_chain
            .ok_or(StateError::OutOfOrder("wrap_apdu called before ext_auth"))?;

        let final_lc = data.len() + 8;
        if final_lc > 0xFF {
            return Err(BoundsError::LcOverflow(final_lc).into());
        }
        let to_sign = mac_chain_data(
            &mac_chain,
            scla,
            cmd.instruction(),
            cmd.p1(),
            cmd.p2(),
            final_lc as u8,
            &data,
        );
        let mac = aes_cmac(s_mac, &to_sign)?;
        inner.mac_chain = Some(mac);
        data.extend_from_slice(&mac[..8]);
    }

    if data.len() > 0xFF {
        return Err(BoundsError::LcOverflow(data.len()).into());
    }

    let final_cla = cla::derive(channel, true);
    let mut wrapped = if data.is_empty() {
        Command::new(final_cla, cmd.instruction(), cmd.p1(), cmd.p2())
    } else {
        Command::with_data(final_cla, cmd.instruction(), cmd.p1(), cmd.p2(), data)
    };
    if let Some(le) = cmd.le() {
        wrapped = wrapped.with_le(le);
    }

    Ok(wrapped.to_bytes().to_vec())
}

pub(crate) fn unwrap_response(
    inner: &mut Inner,
    response: &[u8],
    sw1: u8,
    sw2: u8,
) -> Result<(Vec<u8>, u8, u8), Error> {
    if (sw1, sw2) != (0x90, 0x00) && sw1 != 0x62 && sw1 != 0x63 {
        if !response.is_empty() {
            return Err(
                ProtocolError::Malformed("non-success response carried an unexpected payload")
                    .into(),
            );
        }
        return Ok((Vec::new(), sw1, sw2));
    }

    let mut body = response.to_vec();
    let active = inner.sl.union_raw(inner.rmac_sl);

    if active & crate::constants::SL_R_MAC != 0 {
        if body.len() > MAX_RMAC_PAYLOAD {
            return Err(BoundsError::RMacPayloadTooLarge(body.len()).into());
        }
        if body.len() < 8 {
            return Err(ProtocolError::UnexpectedLength {
                expected: "at least 8 bytes (R-MAC)",
                actual: body.len(),
            }
            .into());
        }
        let s_rmac = inner
            .s_rmac
            .as_ref()
            .ok_or(StateError::OutOfOrder("R-MAC active before keys were derived"))?;
        let mac_chain = inner
            .mac_chain
            .ok_or(StateError::OutOfOrder("R-MAC active before ext_auth"))?;

        let split = body.len() - 8;
        let (payload, received_mac) = body.split_at(split);

        let mut to_sign = Vec::with_capacity(16 + payload.len() + 2);
        to_sign.extend_from_slice(&mac_chain);
        to_sign.extend_from_slice(payload);
        to_sign.extend_from_slice(&[sw1, sw2]);
        let expected = aes_cmac(s_rmac, &to_sign)?;

        if !bool::from(expected[..8].ct_eq(received_mac)) {
            inner.poisoned = true;
            warn!("R-MAC verification failed, session poisoned");
            return Err(AuthError::RMacMismatch.into());
        }
        body.truncate(split);
    }

    if active & crate::constants::SL_R_ENC != 0 && !body.is_empty() {
        if body.len() > MAX_RENC_PAYLOAD {
            return Err(BoundsError::REncPayloadTooLarge(body.len()).into());
        }
        let s_enc = inner
            .s_enc
            .as_ref()
            .ok_or(StateError::OutOfOrder("R-ENC active before keys were derived"))?;
        let icv = {
            let mut b = counter_block(inner.cmd_count, true);
            ecb_encrypt_block(s_enc, &mut b)?;
            b
        };
        body = cbc_decrypt_padded(s_enc, &icv, &body)?;
    }

    Ok((body, sw1, sw2))
}

#[cfg(feature = "mock")]
pub(crate) use self::server::{unwrap_apdu_server, wrap_response_server};

#[cfg(feature = "mock")]
mod server {
    use super::*;

    /// Server-side mirror of [`wrap_apdu`]: verifies C-MAC first (it covers
    /// the encrypted Lc), then decrypts C-ENC data and strips its padding,
    /// returning the full reconstructed cleartext APDU (CLA restored to its
    /// non-secure form, Lc recomputed) rather than just the data body.
    pub(crate) fn unwrap_apdu_server(inner: &mut Inner, apdu: &[u8]) -> Result<Vec<u8>, Error> {
        let cmd = Command::from_bytes(apdu)?;

        inner.cmd_count = inner
            .cmd_count
            .checked_add(1)
            .ok_or(BoundsError::CommandCounterOverflow)?;

        let scla = cla::neutralize(cmd.class());
        let mut data = cmd.data().unwrap_or(&[]).to_vec();

        if inner.sl.c_mac() {
            if data.len() < 8 {
                return Err(ProtocolError::UnexpectedLength {
                    expected: "at least 8 bytes (C-MAC)",
                    actual: data.len(),
                }
                .into());
            }
            let s_mac = inner.s_mac.as_ref().ok_or(StateError::OutOfOrder(
                "C-MAC active before keys were derived",
            ))?;
            let mac_chain = inner
                .mac_chain
                .ok_or(StateError::OutOfOrder("unwrap_apdu_server called before ext_auth"))?;

            let split = data.len() - 8;
            let (body, received_mac) = data.split_at(split);
            let final_lc = data.len() as u8;
            let to_sign =
                mac_chain_data(&mac_chain, scla, cmd.instruction(), cmd.p1(), cmd.p2(), final_lc, body);
            let expected = aes_cmac(s_mac, &to_sign)?;

            if !bool::from(expected[..8].ct_eq(received_mac)) {
                inner.poisoned = true;
                return Err(AuthError::CMacMismatch.into());
            }
            inner.mac_chain = Some(expected);
            data.truncate(split);
        }

        if inner.sl.c_enc() && !data.is_empty() {
            let s_enc = inner
                .s_enc
                .as_ref()
                .ok_or(StateError::OutOfOrder("C-ENC active before keys were derived"))?;
            let mut icv = counter_block(inner.cmd_count, false);
            ecb_encrypt_block(s_enc, &mut icv)?;
            data = cbc_decrypt_padded(s_enc, &icv, &data)?;
        }

        if data.len() > 0xFF {
            return Err(BoundsError::LcOverflow(data.len()).into());
        }

        let cleartext_cla = cla::derive(cla::channel(cmd.class()), false);
        let mut cleartext = vec![cleartext_cla, cmd.instruction(), cmd.p1(), cmd.p2()];
        if !data.is_empty() {
            cleartext.push(data.len() as u8);
            cleartext.extend_from_slice(&data);
        }
        Ok(cleartext)
    }

    /// Server-side mirror of [`unwrap_response`](super::unwrap_response):
    /// R-ENC first, then R-MAC over the ciphertext (so the client verifies
    /// the MAC before attempting to decrypt).
    pub(crate) fn wrap_response_server(
        inner: &mut Inner,
        resp: &[u8],
        sw1: u8,
        sw2: u8,
    ) -> Result<Vec<u8>, Error> {
        let mut body = resp.to_vec();
        let active = inner.sl.union_raw(inner.rmac_sl);

        if active & crate::constants::SL_R_ENC != 0 && !body.is_empty() {
            if body.len() > MAX_RENC_PAYLOAD {
                return Err(BoundsError::REncPayloadTooLarge(body.len()).into());
            }
            let s_enc = inner
                .s_enc
                .as_ref()
                .ok_or(StateError::OutOfOrder("R-ENC active before keys were derived"))?;
            let mut icv = counter_block(inner.cmd_count, true);
            ecb_encrypt_block(s_enc, &mut icv)?;
            body = cbc_encrypt_padded(s_enc, &icv, &body)?;
        }

        if active & crate::constants::SL_R_MAC != 0 {
            if body.len() > MAX_RMAC_PAYLOAD {
                return Err(BoundsError::RMacPayloadTooLarge(body.len()).into());
            }
            let s_rmac = inner
                .s_rmac
                .as_ref()
                .ok_or(StateError::OutOfOrder("R-MAC active before keys were derived"))?;
            let mac_chain = inner
                .mac_chain
                .ok_or(StateError::OutOfOrder("wrap_response_server called before ext_auth"))?;

            let mut to_sign = Vec::with_capacity(16 + body.len() + 2);
            to_sign.extend_from_slice(&mac_chain);
            to_sign.extend_from_slice(&body);
            to_sign.extend_from_slice(&[sw1, sw2]);
            let mac = aes_cmac(s_rmac, &to_sign)?;
            body.extend_from_slice(&mac[..8]);
        }

        Ok(body)
    }
}
