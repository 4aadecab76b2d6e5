//! End-to-end scenarios using the shared literal test vectors, matched
//! byte-for-byte against a known-good SCP03 exchange: INITIALIZE UPDATE,
//! key derivation, EXTERNAL AUTHENTICATE, a full wrap at SL=3, and BEGIN
//! R-MAC. Kept in an integration `tests/` directory, separate from the
//! colocated `#[cfg(test)]` unit tests in each module.

use gp_scp03::config::{ScpParameter, SecurityLevel, SessionConfig};
use gp_scp03::crypto::cmac::aes_cmac;
use gp_scp03::crypto::kdf::kdf;
use gp_scp03::keys::StaticKeySet;
use gp_scp03::session::{Authenticated, Session};
use hex_literal::hex;

const SD_AID: [u8; 15] = hex!("A0 00 00 00 18 43 4D 08 09 0A 0B 0C 00 00 00");
const KEY_ENC: [u8; 16] = hex!("40 41 42 43 44 45 46 47 48 49 4A 4B 4C 4D 4E 4F");
const KEY_MAC: [u8; 16] = hex!("40 11 22 33 44 45 56 67 48 49 4A 4B 4C 4D 4E 4F");
const KEY_DEK: [u8; 16] = hex!("98 76 54 32 10 40 41 42 43 44 45 46 47 48 49 4A");
const KEY_VERSION: u8 = 0x30;
const SEQ_COUNTER: u32 = 0x00002A;
const DIVER_DATA: [u8; 10] = hex!("00 00 50 C7 60 6A 8C F6 48 00");
const HOST_CHALLENGE: [u8; 8] = hex!("08 07 06 05 04 03 02 01");

const CARD_CHALLENGE: [u8; 8] = hex!("A3 F5 F1 44 D1 9B E6 6E");
const S_ENC: [u8; 16] = hex!("85 2D 20 7B 7C C8 C8 80 23 1E DF D5 C6 44 CF B1");
const S_MAC: [u8; 16] = hex!("71 31 B9 36 9F 3D 19 85 0E 69 19 CD 33 21 52 3E");
const S_RMAC: [u8; 16] = hex!("B5 70 AA 1F DE 18 F9 17 9B 5C BD 42 D8 93 9D 05");
const CARD_CRYPTOGRAM: [u8; 8] = hex!("72 BF CB DF 4A 14 51 5F");
const HOST_CRYPTOGRAM: [u8; 8] = hex!("AE B8 DA D1 86 5B 85 E2");
const INIT_UPDATE_RESPONSE: [u8; 32] = hex!(
    "00 00 50 C7 60 6A 8C F6 48 00 30 03 70 A3 F5 F1 44 D1 9B E6 6E \
     72 BF CB DF 4A 14 51 5F 00 00 2A"
);

fn keys() -> StaticKeySet {
    StaticKeySet::new(&KEY_ENC, &KEY_MAC, &KEY_DEK, KEY_VERSION).unwrap()
}

fn config() -> SessionConfig {
    SessionConfig::new(
        &SD_AID,
        ScpParameter::default_value(),
        KEY_VERSION,
        SEQ_COUNTER,
        DIVER_DATA,
        0,
    )
    .unwrap()
}

/// Drive INITIALIZE UPDATE / EXTERNAL AUTHENTICATE to an authenticated
/// session at `sl`, returning it alongside the EXTERNAL AUTHENTICATE APDU
/// so callers can assert on either.
fn authenticated(sl: SecurityLevel) -> (Session<Authenticated>, Vec<u8>) {
    let mut session = Session::new(keys(), config());
    let _init_update = session.init_update(HOST_CHALLENGE);
    let session = session
        .parse_init_update_response(&INIT_UPDATE_RESPONSE)
        .expect("card cryptogram must verify against S2's vectors");
    session.ext_auth(sl).expect("sl is one of the six accepted values")
}

#[test]
fn s1_init_update_apdu_matches_literal_bytes() {
    let mut session = Session::new(keys(), config());
    let apdu = session.init_update(HOST_CHALLENGE);
    assert_eq!(apdu, hex!("80 50 30 00 08 08 07 06 05 04 03 02 01"));
}

#[test]
fn s2_key_derivation_matches_literal_vectors() {
    let mut context = Vec::with_capacity(16);
    context.extend_from_slice(&HOST_CHALLENGE);
    context.extend_from_slice(&CARD_CHALLENGE);

    let s_enc = kdf(&KEY_ENC, 0x04, 8 * 16, &context).unwrap();
    let s_mac = kdf(&KEY_MAC, 0x06, 8 * 16, &context).unwrap();
    let s_rmac = kdf(&KEY_MAC, 0x07, 8 * 16, &context).unwrap();
    assert_eq!(s_enc, S_ENC);
    assert_eq!(s_mac, S_MAC);
    assert_eq!(s_rmac, S_RMAC);

    let card_cryptogram = kdf(&s_mac, 0x00, 64, &context).unwrap();
    let host_cryptogram = kdf(&s_mac, 0x01, 64, &context).unwrap();
    assert_eq!(card_cryptogram, CARD_CRYPTOGRAM);
    assert_eq!(host_cryptogram, HOST_CRYPTOGRAM);

    // The session arrives at the same keys via parse_init_update_response,
    // which additionally verifies the card cryptogram against this exact
    // response layout.
    let mut session = Session::new(keys(), config());
    let _ = session.init_update(HOST_CHALLENGE);
    assert!(session.parse_init_update_response(&INIT_UPDATE_RESPONSE).is_ok());
}

#[test]
fn s2_tampered_card_cryptogram_is_rejected() {
    let mut tampered = INIT_UPDATE_RESPONSE;
    tampered[21] ^= 0xFF; // first byte of the card cryptogram field

    let mut session = Session::new(keys(), config());
    let _ = session.init_update(HOST_CHALLENGE);
    let err = session.parse_init_update_response(&tampered).unwrap_err();
    assert!(matches!(err, gp_scp03::Error::Auth(_)));
}

#[test]
fn s3_ext_auth_apdu_and_mac_chain_match_literal_vectors() {
    let (_, apdu) = authenticated(SecurityLevel::new(0x01).unwrap());
    assert_eq!(
        apdu,
        hex!("84 82 01 00 10 AE B8 DA D1 86 5B 85 E2 49 FC 4C F1 84 E6 1D CD")
    );

    // MAC_chain is CMAC(S_MAC, data_to_sign); recompute independently and
    // compare to the literal 16-byte chain value from S3.
    let mut data_to_sign = Vec::with_capacity(16 + 5 + 8);
    data_to_sign.extend_from_slice(&[0u8; 16]);
    data_to_sign.extend_from_slice(&[0x84, 0x82, 0x01, 0x00, 0x10]);
    data_to_sign.extend_from_slice(&HOST_CRYPTOGRAM);
    let mac_chain = aes_cmac(&S_MAC, &data_to_sign).unwrap();
    assert_eq!(
        mac_chain,
        hex!("49 FC 4C F1 84 E6 1D CD 4C 39 28 E4 C6 17 FB A3")
    );
    // The APDU's trailing 8 bytes are the first half of that chain value.
    assert_eq!(&apdu[apdu.len() - 8..], &mac_chain[..8]);
}

#[test]
fn s4_wrap_with_sl3_matches_literal_encrypted_payload() {
    let (mut session, _) = authenticated(SecurityLevel::new(0x03).unwrap());
    let cleartext = hex!("80 E6 02 00 15 0A 45 78 65 72 63 69 73 65 52 36 00 00 06 EF 04 C6 02 06 82 00");
    let wrapped = session.wrap_apdu(&cleartext).unwrap();

    // wrapped = CLA INS P1 P2 Lc <encrypted data><8-byte C-MAC>
    let lc = wrapped[4] as usize;
    let body = &wrapped[5..5 + lc];
    let encrypted = &body[..body.len() - 8];
    assert_eq!(
        encrypted,
        hex!(
            "DF 31 90 7F C0 27 48 2D 5D CB 7D C0 28 24 5F 7C \
             10 8C A4 D2 AF F1 22 75 07 97 68 E1 EF E9 42 9E"
        )
    );
    assert_eq!(wrapped[0] & 0x04, 0x04, "secure messaging bit must be set");
}

#[cfg(feature = "mock")]
#[test]
fn s5_unwrap_is_idempotent_for_sl_1_and_sl_3() {
    use gp_scp03::session::mock::MockCard;

    for sl_byte in [0x01, 0x03] {
        let sl = SecurityLevel::new(sl_byte).unwrap();

        let mut client = Session::new(keys(), config());
        let _ = client.init_update(HOST_CHALLENGE);
        let client = client.parse_init_update_response(&INIT_UPDATE_RESPONSE).unwrap();
        let (mut client, ext_auth_apdu) = client.ext_auth(sl).unwrap();

        let mut card = MockCard::new(keys(), config());
        let _ = card
            .respond_to_init_update(HOST_CHALLENGE, CARD_CHALLENGE)
            .unwrap();
        card.verify_ext_auth(&ext_auth_apdu).unwrap();

        let cleartext =
            hex!("80 E6 02 00 15 0A 45 78 65 72 63 69 73 65 52 36 00 00 06 EF 04 C6 02 06 82 00");
        let wrapped = client.wrap_apdu(&cleartext).unwrap();
        let recovered = card.unwrap_command(&wrapped).unwrap();

        assert_eq!(recovered, cleartext, "SL=0x{sl_byte:02X} must round-trip exactly");
    }
}

#[test]
fn s6_begin_rmac_apdu_shape() {
    let (session, _) = authenticated(SecurityLevel::new(0x01).unwrap());
    let rmac_sl = SecurityLevel::new_rmac(0x10).unwrap();

    let (_, wrapped) = session.begin_rmac(rmac_sl, None).unwrap();

    // wrapped = CLA INS P1 P2 Lc <MAC(8 bytes)>, no salt, no C-ENC active.
    assert_eq!(wrapped[0] & 0x04, 0x04, "secure messaging bit must be set");
    assert_eq!(wrapped[1], 0x7A, "BEGIN R-MAC instruction byte");
    assert_eq!(wrapped[2], 0x10, "P1 carries the requested rmac_SL");
    assert_eq!(wrapped[3], 0x01, "P2 is fixed at 0x01");
    assert_eq!(wrapped[4], 0x08, "Lc is 8: MAC only, no salt");
}

#[test]
fn begin_rmac_length_prefixes_a_supplied_salt() {
    let (session, _) = authenticated(SecurityLevel::new(0x01).unwrap());
    let rmac_sl = SecurityLevel::new_rmac(0x10).unwrap();
    let salt = hex!("AA BB CC");

    let (_, wrapped) = session.begin_rmac(rmac_sl, Some(&salt)).unwrap();

    // Command data is salt_len || salt, not the raw salt, so Lc grows by
    // one extra byte for the length prefix plus the 8-byte C-MAC.
    assert_eq!(wrapped[4], 1 + salt.len() as u8 + 8, "Lc = len-prefix + salt + C-MAC");
    let lc = wrapped[4] as usize;
    let body = &wrapped[5..5 + lc];
    assert_eq!(body[0], salt.len() as u8, "data opens with the salt length byte");
    assert_eq!(&body[1..1 + salt.len()], &salt[..], "salt follows its length byte");
}

#[test]
fn begin_rmac_rejects_rmac_already_negotiated_in_sl() {
    // ext_auth(SL=0x11) already negotiated C-MAC + R-MAC; a subsequent
    // begin_rmac(0x10) cannot raise R-MAC further and must be rejected.
    let (session, _) = authenticated(SecurityLevel::new(0x11).unwrap());
    let rmac_sl = SecurityLevel::new_rmac(0x10).unwrap();

    let err = session.begin_rmac(rmac_sl, None).unwrap_err();
    assert!(matches!(err, gp_scp03::Error::State(_)));
}

#[test]
fn begin_rmac_rejects_renc_already_in_sl() {
    // ext_auth(SL=0x33) already negotiated full C-MAC+C-ENC+R-MAC+R-ENC;
    // BEGIN R-MAC is never legal once R-ENC is already active in SL.
    let (session, _) = authenticated(SecurityLevel::new(0x33).unwrap());
    let rmac_sl = SecurityLevel::new_rmac(0x30).unwrap();

    let err = session.begin_rmac(rmac_sl, None).unwrap_err();
    assert!(matches!(err, gp_scp03::Error::State(_)));
}
