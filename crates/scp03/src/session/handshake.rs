//! Handshake logic: build/parse INITIALIZE UPDATE and EXTERNAL
//! AUTHENTICATE, derive session keys, compute/verify cryptograms, and
//! accept BEGIN R-MAC. Operates on [`Inner`] directly so the typed
//! `Session<Phase>` wrappers in `mod.rs` can share one implementation.

use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::wrap::wrap_apdu;
use super::Inner;
use crate::challenge::{CardChallenge, Cryptogram, HostChallenge};
use crate::cla;
use crate::config::SecurityLevel;
use crate::constants::{
    DDC_CARD_CHALLENGE, DDC_CARD_CRYPTOGRAM, DDC_HOST_CRYPTOGRAM, DDC_S_ENC, DDC_S_MAC,
    DDC_S_RMAC, INS_BEGIN_RMAC, INS_EXTERNAL_AUTHENTICATE, INS_INITIALIZE_UPDATE, SCP_IDENTIFIER,
    SL_R_ENC, SL_R_MAC,
};
use crate::crypto::cmac::aes_cmac;
use crate::crypto::kdf::kdf;
use crate::error::{AuthError, ConfigError, Error, ProtocolError, StateError};

pub(crate) fn build_init_update(inner: &mut Inner, host_challenge: [u8; 8]) -> Vec<u8> {
    inner.host_challenge = Some(HostChallenge::new(host_challenge));

    let cla = cla::derive(inner.config.log_ch(), false);
    let mut apdu = Vec::with_capacity(13);
    apdu.extend_from_slice(&[
        cla,
        INS_INITIALIZE_UPDATE,
        inner.config.key_version(),
        0x00,
        0x08,
    ]);
    apdu.extend_from_slice(&host_challenge);
    apdu
}

pub(crate) fn parse_init_update_response(inner: &mut Inner, resp: &[u8]) -> Result<(), Error> {
    let host_challenge = inner.host_challenge.ok_or(StateError::OutOfOrder(
        "parse_init_update_response called before init_update",
    ))?;

    if resp.len() != 29 && resp.len() != 32 {
        return Err(ProtocolError::UnexpectedLength {
            expected: "29 or 32 bytes",
            actual: resp.len(),
        }
        .into());
    }

    let diver_data = &resp[0..10];
    let key_version = resp[10];
    let scp = resp[11];
    let i_byte = resp[12];
    let card_challenge_bytes: [u8; 8] = resp[13..21].try_into().unwrap();
    let card_cryptogram_bytes: [u8; 8] = resp[21..29].try_into().unwrap();

    if scp != SCP_IDENTIFIER {
        return Err(ProtocolError::UnsupportedScpVersion(scp).into());
    }

    let i = crate::config::ScpParameter::new(i_byte)?;
    if i.raw() != inner.config.i().raw() {
        return Err(ProtocolError::Malformed(
            "INITIALIZE UPDATE response's i parameter does not match the configured i",
        )
        .into());
    }
    let _ = (diver_data, key_version); // informational fields, not cryptographically load-bearing here

    let has_seq_counter = resp.len() == 32;
    if has_seq_counter != i.pseudo_random_challenge() {
        return Err(ProtocolError::SeqCounterPresence.into());
    }

    let card_challenge = if i.pseudo_random_challenge() {
        let seq_counter = u32::from_be_bytes([0, resp[29], resp[30], resp[31]]);
        let context = {
            let mut c = Vec::with_capacity(3 + inner.config.sd_aid().len());
            c.extend_from_slice(&seq_counter.to_be_bytes()[1..]);
            c.extend_from_slice(inner.config.sd_aid());
            c
        };
        let derived: [u8; 8] = kdf(inner.keys.enc(), DDC_CARD_CHALLENGE, 64, &context)?
            .try_into()
            .expect("KDF with L=64 always yields 8 bytes");
        if derived != card_challenge_bytes {
            return Err(ProtocolError::Malformed(
                "card challenge does not match the value derived from seq_counter",
            )
            .into());
        }
        CardChallenge::new(derived)
    } else {
        CardChallenge::new(card_challenge_bytes)
    };

    let mut context = Vec::with_capacity(16);
    context.extend_from_slice(host_challenge.as_bytes());
    context.extend_from_slice(card_challenge.as_bytes());

    let s_enc = kdf(inner.keys.enc(), DDC_S_ENC, 8 * inner.keys.enc().len() as u16, &context)?;
    let s_mac = kdf(inner.keys.mac(), DDC_S_MAC, 8 * inner.keys.mac().len() as u16, &context)?;
    let s_rmac = kdf(inner.keys.mac(), DDC_S_RMAC, 8 * inner.keys.mac().len() as u16, &context)?;

    let expected_card_cryptogram: [u8; 8] = kdf(&s_mac, DDC_CARD_CRYPTOGRAM, 64, &context)?
        .try_into()
        .expect("KDF with L=64 always yields 8 bytes");
    let host_cryptogram: [u8; 8] = kdf(&s_mac, DDC_HOST_CRYPTOGRAM, 64, &context)?
        .try_into()
        .expect("KDF with L=64 always yields 8 bytes");

    if !bool::from(expected_card_cryptogram.ct_eq(&card_cryptogram_bytes)) {
        warn!("card cryptogram did not match the host-computed expectation");
        return Err(AuthError::CardCryptogramMismatch.into());
    }
    debug!("card cryptogram verified, session keys derived");

    inner.card_challenge = Some(card_challenge);
    inner.s_enc = Some(Zeroizing::new(s_enc));
    inner.s_mac = Some(Zeroizing::new(s_mac));
    inner.s_rmac = Some(Zeroizing::new(s_rmac));
    inner.card_cryptogram = Some(Cryptogram::new(card_cryptogram_bytes));
    inner.host_cryptogram = Some(Cryptogram::new(host_cryptogram));
    inner.mac_chain = None;

    Ok(())
}

pub(crate) fn build_ext_auth(inner: &mut Inner, sl: SecurityLevel) -> Result<Vec<u8>, Error> {
    let i = inner.config.i();
    if sl.r_mac() && !i.supports_rmac() {
        return Err(ConfigError::InvalidSecurityLevel(sl.raw()).into());
    }
    if sl.r_enc() && !i.supports_renc() {
        return Err(ConfigError::InvalidSecurityLevel(sl.raw()).into());
    }

    let s_mac = inner
        .s_mac
        .as_ref()
        .ok_or(StateError::OutOfOrder("ext_auth called before keys were derived"))?;
    let host_cryptogram = inner
        .host_cryptogram
        .ok_or(StateError::OutOfOrder("ext_auth called before keys were derived"))?;

    let mut data_to_sign = Vec::with_capacity(16 + 5 + 8);
    data_to_sign.extend_from_slice(&[0u8; 16]);
    data_to_sign.extend_from_slice(&[
        cla::neutralize(cla::derive(inner.config.log_ch(), true)),
        INS_EXTERNAL_AUTHENTICATE,
        sl.raw(),
        0x00,
        0x10,
    ]);
    data_to_sign.extend_from_slice(host_cryptogram.as_bytes());

    let mac = aes_cmac(s_mac, &data_to_sign)?;
    inner.mac_chain = Some(mac);

    let mut apdu = Vec::with_capacity(5 + 16);
    apdu.extend_from_slice(&[
        cla::derive(inner.config.log_ch(), true),
        INS_EXTERNAL_AUTHENTICATE,
        sl.raw(),
        0x00,
        0x10,
    ]);
    apdu.extend_from_slice(host_cryptogram.as_bytes());
    apdu.extend_from_slice(&mac[..8]);

    inner.sl = sl;
    inner.rmac_sl = SecurityLevel::NONE;
    inner.cmd_count = 0;
    debug!(sl = sl.raw(), "security level installed, command counter reset");

    Ok(apdu)
}

pub(crate) fn build_begin_rmac(
    inner: &mut Inner,
    rmac_sl: SecurityLevel,
    salt: Option<&[u8]>,
) -> Result<Vec<u8>, Error> {
    let i = inner.config.i();
    if rmac_sl.raw() & SL_R_MAC == 0 {
        return Err(ConfigError::InvalidSecurityLevel(rmac_sl.raw()).into());
    }
    if rmac_sl.raw() & SL_R_ENC != 0 && !inner.sl.c_enc() {
        return Err(StateError::OutOfOrder(
            "BEGIN R-MAC with R-ENC requires C-ENC already active in SL",
        )
        .into());
    }
    if !inner.sl.c_mac() {
        return Err(StateError::OutOfOrder("BEGIN R-MAC requires C-MAC already active in SL").into());
    }
    if inner.sl.r_enc() {
        return Err(StateError::OutOfOrder("R-ENC already in SL for BEGIN R-MAC").into());
    }
    if rmac_sl.raw() <= (inner.sl.raw() & SL_R_MAC) {
        return Err(StateError::OutOfOrder("R-MAC already in SL for BEGIN R-MAC").into());
    }
    if rmac_sl.r_mac() && !i.supports_rmac() {
        return Err(ConfigError::InvalidSecurityLevel(rmac_sl.raw()).into());
    }
    if rmac_sl.r_enc() && !i.supports_renc() {
        return Err(ConfigError::InvalidSecurityLevel(rmac_sl.raw()).into());
    }

    // The command data field is the salt length-prefixed with its own byte
    // count (`salt_len || salt`), not the raw salt — an empty `data` field
    // when no salt is supplied, matching `beginRMAC`'s `chr(len(saltData))
    // + saltData` / `data = ''` split.
    let data = match salt {
        Some(salt) => {
            if salt.len() >= 0xFF {
                return Err(crate::error::BoundsError::LcOverflow(salt.len() + 1).into());
            }
            let mut d = Vec::with_capacity(1 + salt.len());
            d.push(salt.len() as u8);
            d.extend_from_slice(salt);
            d
        }
        None => Vec::new(),
    };

    let mut apdu = Vec::with_capacity(5 + data.len());
    apdu.extend_from_slice(&[
        cla::derive(inner.config.log_ch(), false),
        INS_BEGIN_RMAC,
        rmac_sl.raw(),
        0x01,
        data.len() as u8,
    ]);
    apdu.extend_from_slice(&data);

    let wrapped = wrap_apdu(inner, &apdu)?;

    // Commit synchronously: no intervening wrap/unwrap can occur between
    // here and the caller receiving `Session<RMacActive>`, so there is no
    // need to stage this behind a pending field the way the reference
    // implementation does.
    inner.rmac_sl = rmac_sl;

    Ok(wrapped)
}
