//! The SCP03 session state machine, represented as a typestate rather than
//! attribute sentinels. Illegal calls for the current phase are compile
//! errors, not runtime `StateError`s; `StateError` is reserved for
//! sequencing problems the type system cannot see (a poisoned session
//! after a MAC failure).

mod handshake;
mod wrap;

#[cfg(feature = "mock")]
pub mod mock;

use zeroize::Zeroizing;

use crate::challenge::{CardChallenge, Cryptogram, HostChallenge};
use crate::config::{ScpParameter, SecurityLevel, SessionConfig};
use crate::crypto::Dek;
use crate::error::{Error, StateError};
use crate::keys::StaticKeySet;

/// Phase marker: static keys and parameters are set, no handshake traffic
/// has been exchanged yet.
#[derive(Debug)]
pub struct Configured(());

/// Phase marker: INITIALIZE UPDATE response parsed, session keys derived
/// and the card cryptogram verified.
#[derive(Debug)]
pub struct KeysDerived(());

/// Phase marker: EXTERNAL AUTHENTICATE has installed a security level.
#[derive(Debug)]
pub struct Authenticated(());

/// Phase marker: BEGIN R-MAC has elevated response-side protection.
#[derive(Debug)]
pub struct RMacActive(());

pub(crate) struct Inner {
    keys: StaticKeySet,
    config: SessionConfig,
    host_challenge: Option<HostChallenge>,
    card_challenge: Option<CardChallenge>,
    s_enc: Option<Zeroizing<Vec<u8>>>,
    s_mac: Option<Zeroizing<Vec<u8>>>,
    s_rmac: Option<Zeroizing<Vec<u8>>>,
    host_cryptogram: Option<Cryptogram>,
    card_cryptogram: Option<Cryptogram>,
    mac_chain: Option<[u8; 16]>,
    cmd_count: u64,
    sl: SecurityLevel,
    rmac_sl: SecurityLevel,
    poisoned: bool,
}

impl Inner {
    fn new(keys: StaticKeySet, config: SessionConfig) -> Self {
        Self {
            keys,
            config,
            host_challenge: None,
            card_challenge: None,
            s_enc: None,
            s_mac: None,
            s_rmac: None,
            host_cryptogram: None,
            card_cryptogram: None,
            mac_chain: None,
            cmd_count: 0,
            sl: SecurityLevel::NONE,
            rmac_sl: SecurityLevel::NONE,
            poisoned: false,
        }
    }

    fn check_not_poisoned(&self) -> Result<(), Error> {
        if self.poisoned {
            Err(StateError::Poisoned.into())
        } else {
            Ok(())
        }
    }
}

/// A SCP03 session, tagged with its current handshake phase.
pub struct Session<Phase> {
    inner: Inner,
    _phase: std::marker::PhantomData<Phase>,
}

impl<Phase> std::fmt::Debug for Session<Phase> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("phase", &std::any::type_name::<Phase>())
            .field("cmd_count", &self.inner.cmd_count)
            .field("sl", &self.inner.sl.raw())
            .field("rmac_sl", &self.inner.rmac_sl.raw())
            .finish_non_exhaustive()
    }
}

impl Session<Configured> {
    /// Begin a session from static keys and validated parameters.
    pub fn new(keys: StaticKeySet, config: SessionConfig) -> Self {
        Self {
            inner: Inner::new(keys, config),
            _phase: std::marker::PhantomData,
        }
    }

    /// Build the INITIALIZE UPDATE command APDU and record `host_challenge`
    /// for later key derivation.
    pub fn init_update(&mut self, host_challenge: [u8; 8]) -> Vec<u8> {
        handshake::build_init_update(&mut self.inner, host_challenge)
    }

    /// Parse the INITIALIZE UPDATE response, deriving session keys and
    /// verifying the card cryptogram. Consumes the session and advances it
    /// to [`KeysDerived`] on success.
    pub fn parse_init_update_response(
        mut self,
        response: &[u8],
    ) -> Result<Session<KeysDerived>, Error> {
        handshake::parse_init_update_response(&mut self.inner, response)?;
        Ok(Session {
            inner: self.inner,
            _phase: std::marker::PhantomData,
        })
    }
}

impl Session<KeysDerived> {
    /// Build the EXTERNAL AUTHENTICATE command APDU for the requested
    /// security level. Consumes the session and advances it to
    /// [`Authenticated`] on success.
    pub fn ext_auth(
        mut self,
        sl: SecurityLevel,
    ) -> Result<(Session<Authenticated>, Vec<u8>), Error> {
        let apdu = handshake::build_ext_auth(&mut self.inner, sl)?;
        Ok((
            Session {
                inner: self.inner,
                _phase: std::marker::PhantomData,
            },
            apdu,
        ))
    }
}

impl Session<Authenticated> {
    /// Wrap a cleartext command APDU per the negotiated security level.
    pub fn wrap_apdu(&mut self, apdu: &[u8]) -> Result<Vec<u8>, Error> {
        self.inner.check_not_poisoned()?;
        wrap::wrap_apdu(&mut self.inner, apdu)
    }

    /// Unwrap a response APDU (payload + status word) per the negotiated
    /// security level.
    pub fn unwrap_response(
        &mut self,
        response: &[u8],
        sw1: u8,
        sw2: u8,
    ) -> Result<(Vec<u8>, u8, u8), Error> {
        self.inner.check_not_poisoned()?;
        wrap::unwrap_response(&mut self.inner, response, sw1, sw2)
    }

    /// Build a BEGIN R-MAC command APDU and, once wrapped, commit the
    /// elevated security level. Consumes the session and advances it to
    /// [`RMacActive`] on success.
    pub fn begin_rmac(
        mut self,
        rmac_sl: SecurityLevel,
        salt: Option<&[u8]>,
    ) -> Result<(Session<RMacActive>, Vec<u8>), Error> {
        self.inner.check_not_poisoned()?;
        let apdu = handshake::build_begin_rmac(&mut self.inner, rmac_sl, salt)?;
        Ok((
            Session {
                inner: self.inner,
                _phase: std::marker::PhantomData,
            },
            apdu,
        ))
    }

    /// The out-of-band Data Encryption Key, independent of session state.
    pub fn dek(&self) -> Dek {
        Dek::new(self.inner.keys.dek())
    }

    /// The current command counter.
    pub const fn cmd_count(&self) -> u64 {
        self.inner.cmd_count
    }
}

impl Session<RMacActive> {
    /// Wrap a cleartext command APDU per the negotiated (and now elevated)
    /// security level.
    pub fn wrap_apdu(&mut self, apdu: &[u8]) -> Result<Vec<u8>, Error> {
        self.inner.check_not_poisoned()?;
        wrap::wrap_apdu(&mut self.inner, apdu)
    }

    /// Unwrap a response APDU (payload + status word).
    pub fn unwrap_response(
        &mut self,
        response: &[u8],
        sw1: u8,
        sw2: u8,
    ) -> Result<(Vec<u8>, u8, u8), Error> {
        self.inner.check_not_poisoned()?;
        wrap::unwrap_response(&mut self.inner, response, sw1, sw2)
    }

    /// The out-of-band Data Encryption Key, independent of session state.
    pub fn dek(&self) -> Dek {
        Dek::new(self.inner.keys.dek())
    }

    /// The current command counter.
    pub const fn cmd_count(&self) -> u64 {
        self.inner.cmd_count
    }
}

/// Reveal the negotiated `i` parameter, for callers that want to inspect
/// configuration without reaching into phase-specific state.
pub fn parameter<Phase>(session: &Session<Phase>) -> ScpParameter {
    session.inner.config.i()
}
