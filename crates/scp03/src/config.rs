//! Negotiated protocol parameters: the `i` byte, security levels, and the
//! per-session configuration built from them. Every constructor here
//! validates rather than `assert!`s, turning the reference implementation's
//! constructor-time assertions into typed [`ConfigError`]s.

use crate::constants::{
    ACCEPTED_SECURITY_LEVELS, DEFAULT_I, DEFAULT_KEY_VERSION, DEFAULT_SD_AID, I_LEGAL_BITS,
    I_RENC, I_RMAC, SL_C_ENC, SL_C_MAC, SL_R_ENC, SL_R_MAC,
};
use crate::error::{ConfigError, Error};

/// The SCP03 `i` parameter: which optional behaviors this security domain
/// supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScpParameter(u8);

impl ScpParameter {
    /// Validate and wrap a raw `i` byte. Rejects any bit outside
    /// `0x10 | 0x20 | 0x40` and R-ENC (`0x40`) set without R-MAC (`0x20`).
    pub fn new(raw: u8) -> Result<Self, Error> {
        if raw & !I_LEGAL_BITS != 0 {
            return Err(ConfigError::InvalidParameterI(raw).into());
        }
        if raw & I_RENC != 0 && raw & I_RMAC == 0 {
            return Err(ConfigError::InvalidParameterI(raw).into());
        }
        Ok(Self(raw))
    }

    /// The default `i`: pseudo-random challenge, R-MAC and R-ENC capable.
    pub fn default_value() -> Self {
        Self(DEFAULT_I)
    }

    /// `true` if the card challenge is counter-derived rather than
    /// card-supplied.
    pub const fn pseudo_random_challenge(self) -> bool {
        self.0 & 0x10 != 0
    }

    /// `true` if R-MAC is supported.
    pub const fn supports_rmac(self) -> bool {
        self.0 & I_RMAC != 0
    }

    /// `true` if R-ENC is supported (implies R-MAC).
    pub const fn supports_renc(self) -> bool {
        self.0 & I_RENC != 0
    }

    /// The raw byte value.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// A negotiated security level (`SL`), or the elevated `rmac_SL` set by
/// BEGIN R-MAC. Only the six GlobalPlatform-accepted combinations are
/// constructible via [`SecurityLevel::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    /// No protection (`SL == 0`).
    pub const NONE: Self = Self(0);

    /// Validate and wrap a raw SL byte against the accepted set
    /// `{0, 0x01, 0x03, 0x11, 0x13, 0x33}`.
    pub fn new(raw: u8) -> Result<Self, Error> {
        if ACCEPTED_SECURITY_LEVELS.contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(ConfigError::InvalidSecurityLevel(raw).into())
        }
    }

    /// Validate and wrap a raw `rmac_SL` byte for BEGIN R-MAC, a distinct
    /// value space from [`Self::new`]'s command-side `SL`: it must carry
    /// the R-MAC bit and may carry R-ENC, but never C-MAC/C-ENC.
    pub fn new_rmac(raw: u8) -> Result<Self, Error> {
        if raw & SL_R_MAC != 0 && raw & !(SL_R_MAC | SL_R_ENC) == 0 {
            Ok(Self(raw))
        } else {
            Err(ConfigError::InvalidSecurityLevel(raw).into())
        }
    }

    /// `true` if C-MAC is active.
    pub const fn c_mac(self) -> bool {
        self.0 & SL_C_MAC != 0
    }

    /// `true` if C-ENC is active.
    pub const fn c_enc(self) -> bool {
        self.0 & SL_C_ENC != 0
    }

    /// `true` if R-MAC is active.
    pub const fn r_mac(self) -> bool {
        self.0 & SL_R_MAC != 0
    }

    /// `true` if R-ENC is active.
    pub const fn r_enc(self) -> bool {
        self.0 & SL_R_ENC != 0
    }

    /// The raw byte value.
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Bitwise-OR this level with another, without re-validating the
    /// result against the accepted set — used for the response-side
    /// `(SL | rmac_SL)` checks, which are not themselves required to be
    /// one of the six accepted command-side combinations.
    pub const fn union_raw(self, other: Self) -> u8 {
        self.0 | other.0
    }
}

/// Fixed per-session parameters, validated once at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    sd_aid: Vec<u8>,
    i: ScpParameter,
    key_version: u8,
    seq_counter: u32,
    diver_data: [u8; 10],
    log_ch: u8,
}

impl SessionConfig {
    /// Build a session configuration, validating AID length (5-16 bytes),
    /// sequence-counter range (24 bits), and logical channel range (0-19).
    pub fn new(
        sd_aid: &[u8],
        i: ScpParameter,
        key_version: u8,
        seq_counter: u32,
        diver_data: [u8; 10],
        log_ch: u8,
    ) -> Result<Self, Error> {
        if !(5..=16).contains(&sd_aid.len()) {
            return Err(ConfigError::InvalidLength {
                what: "security domain AID",
                expected: "5..=16 bytes",
                actual: sd_aid.len(),
            }
            .into());
        }
        if seq_counter > 0x00FF_FFFF {
            return Err(ConfigError::SeqCounterOverflow(seq_counter).into());
        }
        if log_ch > 19 {
            return Err(ConfigError::InvalidLength {
                what: "logical channel",
                expected: "0..=19",
                actual: log_ch as usize,
            }
            .into());
        }

        Ok(Self {
            sd_aid: sd_aid.to_vec(),
            i,
            key_version,
            seq_counter,
            diver_data,
            log_ch,
        })
    }

    /// Defaults per Amendment D: `i = 0x70`, the default security-domain
    /// AID, key version `0x30`, `seq_counter = 0`, all-zero diversification
    /// data, on the given logical channel.
    pub fn with_defaults(log_ch: u8) -> Result<Self, Error> {
        Self::new(
            &DEFAULT_SD_AID,
            ScpParameter::default_value(),
            DEFAULT_KEY_VERSION,
            0,
            [0u8; 10],
            log_ch,
        )
    }

    /// The target security domain's AID.
    pub fn sd_aid(&self) -> &[u8] {
        &self.sd_aid
    }

    /// The negotiated `i` parameter.
    pub const fn i(&self) -> ScpParameter {
        self.i
    }

    /// The key version byte used in INITIALIZE UPDATE.
    pub const fn key_version(&self) -> u8 {
        self.key_version
    }

    /// The 24-bit sequence counter.
    pub const fn seq_counter(&self) -> u32 {
        self.seq_counter
    }

    /// The 10-byte key diversification data.
    pub const fn diver_data(&self) -> &[u8; 10] {
        &self.diver_data
    }

    /// The logical channel (0-19) this session runs on.
    pub const fn log_ch(&self) -> u8 {
        self.log_ch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scp_parameter_rejects_renc_without_rmac() {
        assert!(ScpParameter::new(0x40).is_err());
        assert!(ScpParameter::new(0x50).is_err());
    }

    #[test]
    fn scp_parameter_accepts_default() {
        let p = ScpParameter::new(0x70).unwrap();
        assert!(p.pseudo_random_challenge());
        assert!(p.supports_rmac());
        assert!(p.supports_renc());
    }

    #[test]
    fn scp_parameter_rejects_unknown_bits() {
        assert!(ScpParameter::new(0x80).is_err());
    }

    #[test]
    fn security_level_accepts_only_the_six_combinations() {
        for sl in [0x00, 0x01, 0x03, 0x11, 0x13, 0x33] {
            assert!(SecurityLevel::new(sl).is_ok());
        }
        assert!(SecurityLevel::new(0x02).is_err());
        assert!(SecurityLevel::new(0x10).is_err());
    }

    #[test]
    fn session_config_rejects_short_aid() {
        assert!(SessionConfig::new(&[0u8; 4], ScpParameter::default_value(), 0x30, 0, [0; 10], 0)
            .is_err());
    }

    #[test]
    fn session_config_rejects_oversized_seq_counter() {
        assert!(SessionConfig::new(
            &DEFAULT_SD_AID,
            ScpParameter::default_value(),
            0x30,
            0x0100_0000,
            [0; 10],
            0
        )
        .is_err());
    }

    #[test]
    fn session_config_with_defaults_is_valid() {
        assert!(SessionConfig::with_defaults(0).is_ok());
    }

    #[test]
    fn security_level_new_rmac_accepts_rmac_and_rmac_renc() {
        assert_eq!(SecurityLevel::new_rmac(0x10).unwrap().raw(), 0x10);
        assert_eq!(SecurityLevel::new_rmac(0x30).unwrap().raw(), 0x30);
    }

    #[test]
    fn security_level_new_rmac_rejects_cmac_bits_and_bare_renc() {
        assert!(SecurityLevel::new_rmac(0x00).is_err());
        assert!(SecurityLevel::new_rmac(0x20).is_err());
        assert!(SecurityLevel::new_rmac(0x11).is_err());
    }
}
