//! Logical-channel-aware CLA byte derivation. Channels 0-3 use the basic
//! interindustry form; 4-19 use the extended form with the channel number
//! offset by four.

use crate::constants::CLA_ISO;

/// Derive the CLA byte for logical channel `ch` (0-19), optionally setting
/// the secure-messaging bit.
pub const fn derive(ch: u8, secure: bool) -> u8 {
    if ch < 4 {
        CLA_ISO | ch | if secure { 0x04 } else { 0 }
    } else {
        CLA_ISO | 0x40 | (ch - 4) | if secure { 0x20 } else { 0 }
    }
}

/// Recover the logical channel number from a received CLA byte.
pub const fn channel(cla: u8) -> u8 {
    if cla & 0x40 == 0 {
        cla & 0x03
    } else {
        (cla & 0x0F) + 4
    }
}

/// Neutralize the logical-channel bits of `cla`, keeping the ISO
/// interindustry bit and forcing the secure-messaging bit on. Used to build
/// the `scla` value that MAC computations sign instead of the wire CLA, so
/// the MAC does not depend on which logical channel a command was sent on.
pub const fn neutralize(cla: u8) -> u8 {
    (cla & 0x80) | 0x04
}

/// `true` if the secure-messaging bit is set in `cla`.
pub const fn is_secure(cla: u8) -> bool {
    if cla & 0x40 == 0 {
        cla & 0x04 != 0
    } else {
        cla & 0x20 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_zero_cleartext_matches_init_update_cla() {
        assert_eq!(derive(0, false), 0x80);
    }

    #[test]
    fn channel_zero_secure() {
        assert_eq!(derive(0, true), 0x84);
    }

    #[test]
    fn channel_four_uses_extended_form() {
        assert_eq!(derive(4, false), 0xC0);
        assert_eq!(derive(4, true), 0xE0);
    }

    #[test]
    fn recovers_channel_and_secure_bit_low_form() {
        let cla = derive(2, true);
        assert_eq!(channel(cla), 2);
        assert!(is_secure(cla));
    }

    #[test]
    fn neutralize_always_yields_0x84_for_iso_cla() {
        assert_eq!(neutralize(derive(0, false)), 0x84);
        assert_eq!(neutralize(derive(10, true)), 0x84);
    }

    #[test]
    fn recovers_channel_and_secure_bit_extended_form() {
        let cla = derive(10, true);
        assert_eq!(channel(cla), 10);
        assert!(is_secure(cla));
        assert!(!is_secure(derive(10, false)));
    }
}
