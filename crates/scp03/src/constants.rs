//! Wire-format constants fixed by GlobalPlatform Card Specification v2.2.1
//! Amendment D. Nothing here is negotiable at runtime.

/// INITIALIZE UPDATE instruction byte.
pub const INS_INITIALIZE_UPDATE: u8 = 0x50;
/// EXTERNAL AUTHENTICATE instruction byte.
pub const INS_EXTERNAL_AUTHENTICATE: u8 = 0x82;
/// BEGIN R-MAC SESSION instruction byte.
pub const INS_BEGIN_RMAC: u8 = 0x7A;
/// END R-MAC SESSION instruction byte.
pub const INS_END_RMAC: u8 = 0x78;
/// GET RESPONSE instruction byte.
pub const INS_GET_RESPONSE: u8 = 0xC0;

/// `i` parameter bit: the card challenge is pseudo-random (counter-derived)
/// rather than card-supplied.
pub const I_PSEUDO_RANDOM: u8 = 0x10;
/// `i` parameter bit: R-MAC is supported.
pub const I_RMAC: u8 = 0x20;
/// `i` parameter bit: R-ENC is supported (only legal together with [`I_RMAC`]).
pub const I_RENC: u8 = 0x40;
/// Every bit Amendment D assigns a meaning to; any other bit set in `i` is
/// a configuration error.
pub const I_LEGAL_BITS: u8 = I_PSEUDO_RANDOM | I_RMAC | I_RENC;
/// Default `i`: pseudo-random challenge, R-MAC and R-ENC capable.
pub const DEFAULT_I: u8 = 0x70;

/// Security level bit: C-MAC.
pub const SL_C_MAC: u8 = 0x01;
/// Security level bit: C-ENC (requires C-MAC).
pub const SL_C_ENC: u8 = 0x02;
/// Security level bit: R-MAC.
pub const SL_R_MAC: u8 = 0x10;
/// Security level bit: R-ENC (requires R-MAC).
pub const SL_R_ENC: u8 = 0x20;

/// The only SL combinations GlobalPlatform card products accept.
pub const ACCEPTED_SECURITY_LEVELS: [u8; 6] = [0x00, 0x01, 0x03, 0x11, 0x13, 0x33];

/// KDF derivation constant: card cryptogram.
pub const DDC_CARD_CRYPTOGRAM: u8 = 0x00;
/// KDF derivation constant: host cryptogram.
pub const DDC_HOST_CRYPTOGRAM: u8 = 0x01;
/// KDF derivation constant: pseudo-random card challenge.
pub const DDC_CARD_CHALLENGE: u8 = 0x02;
/// KDF derivation constant: S-ENC session key.
pub const DDC_S_ENC: u8 = 0x04;
/// KDF derivation constant: S-MAC session key.
pub const DDC_S_MAC: u8 = 0x06;
/// KDF derivation constant: S-RMAC session key.
pub const DDC_S_RMAC: u8 = 0x07;

/// Default security-domain AID (a GlobalPlatform card's ISD).
pub const DEFAULT_SD_AID: [u8; 8] = [0xA0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00, 0x00];
/// Default key version byte.
pub const DEFAULT_KEY_VERSION: u8 = 0x30;

/// SCP version byte the INITIALIZE UPDATE response must carry.
pub const SCP_IDENTIFIER: u8 = 0x03;

/// ISO interindustry class byte base (bit 8 set, no proprietary bits).
pub const CLA_ISO: u8 = 0x80;

/// Maximum short-form Lc/Le value.
pub const MAX_SHORT_LC: usize = 0xFF;
/// Maximum R-ENC payload before `BoundsError::REncPayloadTooLarge`.
pub const MAX_RENC_PAYLOAD: usize = 0xEF;
/// Maximum R-MAC payload before `BoundsError::RMacPayloadTooLarge`.
pub const MAX_RMAC_PAYLOAD: usize = 0xF0;
