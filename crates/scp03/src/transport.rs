//! The transport decorator: a thin adapter over a raw
//! [`CardTransport`](gp_apdu_core::CardTransport) that selects the security
//! domain, drives mutual authentication, and wraps/unwraps application
//! APDUs, chaining `61xx`/`6Cxx` status words along the way.
//!
//! Shaped after `GPSecureChannel`/`CommandProcessor::do_process_command`'s
//! loop (`crates/globalplatform/src/secure_channel.rs`) and
//! `asterix/SCP03.py`'s `SCP03Connection.mut_auth`/`transmit`/`send`.

use gp_apdu_core::{CardTransport, Command, Response};
use tracing::{debug, trace, warn};

use crate::config::{SecurityLevel, SessionConfig};
use crate::crypto::Dek;
use crate::error::{Error, TransportError};
use crate::keys::StaticKeySet;
use crate::session::{Authenticated, RMacActive, Session};

const INS_SELECT: u8 = 0xA4;
const INS_GET_RESPONSE: u8 = 0xC0;

enum ChannelState {
    Authenticated(Session<Authenticated>),
    RMacActive(Session<RMacActive>),
}

/// A SCP03-secured channel over a raw [`CardTransport`]. Owns both the
/// transport and the authenticated session; every `transmit` wraps the
/// caller's cleartext APDU, drains `61xx` GET RESPONSE chaining, retries
/// once on `6Cxx`, and unwraps the final response.
pub struct SecureChannel<T> {
    transport: T,
    // `Option` only to let `begin_rmac` move the `Authenticated` session out
    // by value (to consume it into `RMacActive`) without a placeholder
    // variant; always `Some` except mid-transition inside that one method.
    state: Option<ChannelState>,
}

impl<T> std::fmt::Debug for SecureChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match &self.state {
            Some(ChannelState::Authenticated(_)) => "Authenticated",
            Some(ChannelState::RMacActive(_)) => "RMacActive",
            None => "transitioning",
        };
        f.debug_struct("SecureChannel")
            .field("phase", &phase)
            .finish_non_exhaustive()
    }
}

impl<T: CardTransport> SecureChannel<T> {
    /// Select `config`'s security domain, run INITIALIZE UPDATE / EXTERNAL
    /// AUTHENTICATE over `transport`, and return an authenticated channel
    /// ready for `transmit`.
    pub fn establish(
        mut transport: T,
        keys: StaticKeySet,
        config: SessionConfig,
        host_challenge: [u8; 8],
        sl: SecurityLevel,
    ) -> Result<Self, Error> {
        let sd_aid = config.sd_aid().to_vec();
        debug!(aid = %hex::encode(&sd_aid), "selecting security domain");
        let select = Command::with_data(0x00, INS_SELECT, 0x04, 0x00, sd_aid).with_le(0);
        let (_, sw1, sw2) = Self::transmit_raw_draining(&mut transport, &select.to_bytes())?;
        Self::require_success(sw1, sw2)?;

        let mut session = Session::new(keys, config);
        debug!("sending INITIALIZE UPDATE");
        let init_update = session.init_update(host_challenge);
        let (resp, sw1, sw2) = Self::transmit_raw_draining(&mut transport, &init_update)?;
        Self::require_success(sw1, sw2)?;

        let session = session.parse_init_update_response(&resp)?;
        debug!("session keys derived, card cryptogram verified");

        let (session, ext_auth) = session.ext_auth(sl)?;
        debug!(sl = %format!("0x{:02X}", sl.raw()), "sending EXTERNAL AUTHENTICATE");
        let (_, sw1, sw2) = Self::transmit_raw_draining(&mut transport, &ext_auth)?;
        Self::require_success(sw1, sw2)?;

        debug!("mutual authentication complete");
        Ok(Self {
            transport,
            state: Some(ChannelState::Authenticated(session)),
        })
    }

    /// Wrap, transmit, and unwrap a single application APDU, draining any
    /// `61xx` GET RESPONSE chaining and retrying once on `6Cxx` with the
    /// corrected `Le` for case-1/2 commands.
    pub fn transmit(&mut self, apdu: &[u8]) -> Result<(Vec<u8>, u8, u8), Error> {
        let cmd = Command::from_bytes(apdu)?;
        let is_case_1_or_2 = cmd.data().map_or(true, <[u8]>::is_empty);

        let wrapped = self.wrap(apdu)?;
        trace!(len = wrapped.len(), "transmitting wrapped command");
        let (payload, sw1, sw2) = Self::transmit_raw_draining(&mut self.transport, &wrapped)?;

        let (payload, sw1, sw2) = if sw1 == 0x6C && is_case_1_or_2 {
            warn!(corrected_le = sw2, "card requested 6Cxx retry with corrected Le");
            let retried = cmd.clone().with_le(sw2);
            let wrapped = self.wrap(&retried.to_bytes())?;
            Self::transmit_raw_draining(&mut self.transport, &wrapped)?
        } else {
            (payload, sw1, sw2)
        };

        self.unwrap(&payload, sw1, sw2)
    }

    /// Build the BEGIN R-MAC command, transmit it, and on success elevate
    /// the channel to [`RMacActive`] response protection.
    pub fn begin_rmac(&mut self, rmac_sl: SecurityLevel, salt: Option<&[u8]>) -> Result<(), Error> {
        let Some(ChannelState::Authenticated(session)) = self.state.take() else {
            return Err(crate::error::StateError::OutOfOrder(
                "begin_rmac requires an Authenticated channel not already R-MAC active",
            )
            .into());
        };

        // On error, `session` is already consumed and `self.state` stays
        // `None` — the channel is poisoned rather than silently reusable.
        let (session, apdu) = session.begin_rmac(rmac_sl, salt)?;
        debug!(rmac_sl = %format!("0x{:02X}", rmac_sl.raw()), "sending BEGIN R-MAC");
        let (_, sw1, sw2) = Self::transmit_raw_draining(&mut self.transport, &apdu)?;
        Self::require_success(sw1, sw2)?;

        self.state = Some(ChannelState::RMacActive(session));
        Ok(())
    }

    /// The out-of-band Data Encryption Key.
    ///
    /// # Panics
    ///
    /// Panics if the channel was poisoned by a failed `begin_rmac` call
    /// (the only way `state` can be absent); any prior error from this
    /// channel must be treated as terminal, the same "a MAC mismatch
    /// aborts the session" policy extended to this failure mode.
    pub fn dek(&self) -> Dek {
        match self.state.as_ref().expect("channel poisoned by a failed begin_rmac") {
            ChannelState::Authenticated(s) => s.dek(),
            ChannelState::RMacActive(s) => s.dek(),
        }
    }

    /// `true` once BEGIN R-MAC has elevated response protection.
    pub fn is_rmac_active(&self) -> bool {
        matches!(self.state, Some(ChannelState::RMacActive(_)))
    }

    /// Consume the channel, returning the underlying transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn wrap(&mut self, apdu: &[u8]) -> Result<Vec<u8>, Error> {
        match self.state.as_mut().ok_or(crate::error::StateError::Poisoned)? {
            ChannelState::Authenticated(s) => s.wrap_apdu(apdu),
            ChannelState::RMacActive(s) => s.wrap_apdu(apdu),
        }
    }

    fn unwrap(&mut self, resp: &[u8], sw1: u8, sw2: u8) -> Result<(Vec<u8>, u8, u8), Error> {
        match self.state.as_mut().ok_or(crate::error::StateError::Poisoned)? {
            ChannelState::Authenticated(s) => s.unwrap_response(resp, sw1, sw2),
            ChannelState::RMacActive(s) => s.unwrap_response(resp, sw1, sw2),
        }
    }

    /// Send `apdu`, then follow any `61xx` chain with GET RESPONSE,
    /// returning the accumulated payload and the final status word.
    fn transmit_raw_draining(transport: &mut T, apdu: &[u8]) -> Result<(Vec<u8>, u8, u8), Error> {
        let raw = transport.transmit_raw(apdu)?;
        let response = Response::from_bytes(&raw)?;
        let mut payload = response.payload().to_vec();
        let mut status = response.status();

        while status.has_more_data() {
            let le = status.as_u16() as u8;
            trace!(le, "draining 61xx with GET RESPONSE");
            let get_response = Command::new(0x00, INS_GET_RESPONSE, 0x00, 0x00).with_le(le);
            let raw = transport.transmit_raw(&get_response.to_bytes())?;
            let response = Response::from_bytes(&raw)?;
            payload.extend_from_slice(response.payload());
            status = response.status();
        }

        Ok((payload, status.0, status.1))
    }

    fn require_success(sw1: u8, sw2: u8) -> Result<(), Error> {
        if sw1 == 0x90 && sw2 == 0x00 {
            Ok(())
        } else {
            Err(TransportError::FatalStatus { sw1, sw2 }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScpParameter;
    use bytes::Bytes;
    use hex_literal::hex;
    use std::collections::VecDeque;

    struct ScriptedTransport {
        responses: VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Vec<u8>>) -> Self {
            Self {
                responses: responses.into(),
                sent: Vec::new(),
            }
        }
    }

    impl CardTransport for ScriptedTransport {
        fn transmit_raw(&mut self, command: &[u8]) -> gp_apdu_core::Result<Bytes> {
            self.sent.push(command.to_vec());
            Ok(Bytes::from(
                self.responses
                    .pop_front()
                    .expect("scripted transport ran out of responses"),
            ))
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig::new(
            &hex!("A0 00 00 00 18 43 4D 08 09 0A 0B 0C 00 00 00"),
            ScpParameter::default_value(),
            0x30,
            0x00002A,
            hex!("00 00 50 C7 60 6A 8C F6 48 00"),
            0,
        )
        .unwrap()
    }

    fn test_keys() -> StaticKeySet {
        StaticKeySet::new(
            &hex!("40 41 42 43 44 45 46 47 48 49 4A 4B 4C 4D 4E 4F"),
            &hex!("40 11 22 33 44 45 56 67 48 49 4A 4B 4C 4D 4E 4F"),
            &hex!("98 76 54 32 10 40 41 42 43 44 45 46 47 48 49 4A"),
            0x30,
        )
        .unwrap()
    }

    #[test]
    fn establish_drives_select_init_update_and_ext_auth() {
        let init_update_response =
            hex!("00 00 50 C7 60 6A 8C F6 48 00 30 03 70 A3 F5 F1 44 D1 9B E6 6E 72 BF CB DF 4A 14 51 5F 00 00 2A");

        let transport = ScriptedTransport::new(vec![
            vec![0x90, 0x00],            // SELECT
            init_update_response.to_vec().into_iter().chain([0x90, 0x00]).collect(),
            vec![0x90, 0x00],            // EXTERNAL AUTHENTICATE
        ]);

        let channel = SecureChannel::establish(
            transport,
            test_keys(),
            test_config(),
            hex!("08 07 06 05 04 03 02 01"),
            SecurityLevel::new(0x01).unwrap(),
        );

        assert!(channel.is_ok());
        let channel = channel.unwrap();
        assert!(!channel.is_rmac_active());

        let transport = channel.into_transport();
        assert_eq!(transport.sent.len(), 3);
        assert_eq!(transport.sent[0][1], INS_SELECT);
        assert_eq!(transport.sent[1][1], 0x50); // INITIALIZE UPDATE
        assert_eq!(transport.sent[2][1], 0x82); // EXTERNAL AUTHENTICATE
    }

    #[test]
    fn establish_surfaces_fatal_status_from_select() {
        let transport = ScriptedTransport::new(vec![vec![0x6A, 0x82]]);
        let result = SecureChannel::establish(
            transport,
            test_keys(),
            test_config(),
            hex!("08 07 06 05 04 03 02 01"),
            SecurityLevel::new(0x01).unwrap(),
        );
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn drains_a_61xx_chain() {
        let mut transport = ScriptedTransport::new(vec![
            vec![0x61, 0x05],
            vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x90, 0x00],
        ]);
        let (payload, sw1, sw2) =
            SecureChannel::<ScriptedTransport>::transmit_raw_draining(&mut transport, &[0x00, 0xA4, 0x04, 0x00])
                .unwrap();
        assert_eq!(payload, vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!((sw1, sw2), (0x90, 0x00));
        assert_eq!(transport.sent[1][1], INS_GET_RESPONSE);
    }
}
