//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The Telnet core: a byte-driven RFC 854 state machine plus Q-method
//! option negotiation (RFC 1143), composed with pluggable `TelnetDelegate`s
//! for the options that want in on negotiation (Charset, NAWS, GMCP, MCCP).

use crate::bytes::escape_iac;
use crate::connection::{ConnectionInterface, Receiver, Writer};
use crate::constants::{
    COMMAND_BYTES, CR, DO, DONT, IAC, LF, NEGOTIATION_BYTES, NUL, SB, SE, WILL, WONT, describe_option,
};
use crate::option::{OptionState, OptionTable};

/// State of the RFC 854 byte-decoding automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TelnetState {
    /// Ordinary application bytes.
    Data,
    /// Just saw `IAC`; waiting to learn what kind of command follows.
    Command,
    /// Just saw `IAC <WILL|WONT|DO|DONT>`; waiting for the option byte.
    Negotiation,
    /// Just saw a bare `CR`; waiting to learn how to canonicalize it.
    Newline,
    /// Inside `IAC SB ... `; accumulating subnegotiation payload bytes.
    Subnegotiation,
    /// Inside a subnegotiation, just saw `IAC`; waiting to learn whether
    /// this is an escaped 0xFF byte or the `SE` that ends the subnegotiation.
    SubnegotiationEscaped,
}

/// Shared state and wire primitives a `TelnetDelegate` needs: option table
/// access, the outward `will`/`wont`/`do_`/`dont` intents, and
/// `request_negotiation` for sending a subnegotiation payload.
///
/// Delegates never see the `TelnetHandler` itself (that would re-enter the
/// delegate dispatch loop); they see only this reduced surface.
pub struct TelnetCore {
    options: OptionTable,
    writer: Writer,
    is_client: bool,
}

impl TelnetCore {
    fn new(is_client: bool, writer: Writer) -> Self {
        Self { options: OptionTable::new(), writer, is_client }
    }

    /// True if this side of the connection is the client.
    pub fn is_client(&self) -> bool {
        self.is_client
    }

    /// True if this side of the connection is the server.
    pub fn is_server(&self) -> bool {
        !self.is_client
    }

    /// Writes raw bytes directly to the peer, bypassing any framing. Used by
    /// delegates that need to emit something other than a subnegotiation,
    /// such as MCCP's compressed stream.
    pub fn write(&mut self, data: &[u8]) {
        (self.writer)(data);
    }

    /// Current negotiation state for `option`, if it has ever been
    /// referenced by either side.
    pub fn option_state(&self, option: u8) -> Option<OptionState> {
        self.options.get(option).copied()
    }

    /// True if we currently perform `option`.
    pub fn is_enabled_local(&self, option: u8) -> bool {
        self.options.get(option).is_some_and(|s| s.us.enabled)
    }

    /// True if the peer currently performs `option`.
    pub fn is_enabled_remote(&self, option: u8) -> bool {
        self.options.get(option).is_some_and(|s| s.him.enabled)
    }

    fn send_will(&mut self, option: u8) {
        tracing::debug!(option = describe_option(option).unwrap_or("?"), "send IAC WILL");
        self.write(&[IAC, WILL, option]);
    }

    fn send_wont(&mut self, option: u8) {
        tracing::debug!(option = describe_option(option).unwrap_or("?"), "send IAC WONT");
        self.write(&[IAC, WONT, option]);
    }

    fn send_do(&mut self, option: u8) {
        tracing::debug!(option = describe_option(option).unwrap_or("?"), "send IAC DO");
        self.write(&[IAC, DO, option]);
    }

    fn send_dont(&mut self, option: u8) {
        tracing::debug!(option = describe_option(option).unwrap_or("?"), "send IAC DONT");
        self.write(&[IAC, DONT, option]);
    }

    /// Offers to enable a locally managed option. No-op with a warning if
    /// the option is already under negotiation or already enabled.
    pub fn will(&mut self, option: u8) {
        let state = self.options.get_or_init(option);
        if state.us.negotiating || state.him.negotiating {
            tracing::warn!(option, "offering to enable option already under negotiation");
        } else if state.us.enabled {
            tracing::warn!(option, "attempting to enable an already enabled option");
        } else {
            state.us.negotiating = true;
            self.send_will(option);
        }
    }

    /// Offers to disable a locally managed option. No-op with a warning if
    /// the option is already under negotiation or already disabled.
    pub fn wont(&mut self, option: u8) {
        let state = self.options.get_or_init(option);
        if state.us.negotiating || state.him.negotiating {
            tracing::warn!(option, "refusing option already under negotiation");
        } else if !state.us.enabled {
            tracing::warn!(option, "attempting to disable an already disabled option");
        } else {
            state.us.negotiating = true;
            self.send_wont(option);
        }
    }

    /// Requests that the peer enable a remotely managed option. No-op with
    /// a warning if the option is already under negotiation or enabled.
    pub fn do_(&mut self, option: u8) {
        let state = self.options.get_or_init(option);
        if state.us.negotiating || state.him.negotiating {
            tracing::warn!(option, "requesting option already under negotiation");
        } else if state.him.enabled {
            tracing::warn!(option, "requesting peer enable an already enabled option");
        } else {
            state.him.negotiating = true;
            self.send_do(option);
        }
    }

    /// Requests that the peer disable a remotely managed option. No-op with
    /// a warning if the option is already under negotiation or disabled.
    pub fn dont(&mut self, option: u8) {
        let state = self.options.get_or_init(option);
        if state.us.negotiating || state.him.negotiating {
            tracing::warn!(option, "requesting option already under negotiation");
        } else if !state.him.enabled {
            tracing::warn!(option, "requesting peer disable an already disabled option");
        } else {
            state.him.negotiating = true;
            self.send_dont(option);
        }
    }

    /// Sends `IAC SB <option> <data, IAC-escaped> IAC SE`.
    pub fn request_negotiation(&mut self, option: u8, data: &[u8]) {
        let escaped = escape_iac(data);
        let mut frame = Vec::with_capacity(escaped.len() + 5);
        frame.push(IAC);
        frame.push(SB);
        frame.push(option);
        frame.extend_from_slice(&escaped);
        frame.push(IAC);
        frame.push(SE);
        self.write(&frame);
    }
}

/// A pluggable participant in Telnet option negotiation.
///
/// `TelnetHandler` owns a chain of these, tried in registration order,
/// mirroring the method-resolution-order chain a set of cooperatively
/// multiply-inherited mixins would form. The first delegate that claims an
/// option (returns `Some`/`true`) handles it; later delegates are not
/// consulted for that call.
///
/// All methods default to "not mine" so a delegate need only override the
/// handful it actually cares about.
pub trait TelnetDelegate: Send {
    /// Decide whether to accept the peer's request that *we* enable
    /// `option`. Return `None` if this delegate does not manage `option`,
    /// `Some(true)` to accept, `Some(false)` to refuse.
    fn on_enable_local(&mut self, core: &mut TelnetCore, option: u8) -> Option<bool> {
        let _ = (core, option);
        None
    }

    /// Clean up after a locally managed option is disabled. Return `true`
    /// if this delegate owns `option` (whether or not cleanup was needed).
    fn on_disable_local(&mut self, core: &mut TelnetCore, option: u8) -> bool {
        let _ = (core, option);
        false
    }

    /// Decide whether to allow the peer to enable `option` on their side.
    /// Return `None` if this delegate does not manage `option`.
    fn on_enable_remote(&mut self, core: &mut TelnetCore, option: u8) -> Option<bool> {
        let _ = (core, option);
        None
    }

    /// Clean up after a remotely managed option is disabled. Return `true`
    /// if this delegate owns `option`.
    fn on_disable_remote(&mut self, core: &mut TelnetCore, option: u8) -> bool {
        let _ = (core, option);
        false
    }

    /// Called once an option has been fully enabled, on whichever side.
    /// Return `true` if this delegate acted on the notification (stops the
    /// chain from trying later delegates for this call).
    fn on_option_enabled(&mut self, core: &mut TelnetCore, option: u8) -> bool {
        let _ = (core, option);
        false
    }

    /// Handle a subnegotiation payload for `option`. Return `true` if this
    /// delegate owns `option`.
    fn on_subnegotiation(&mut self, core: &mut TelnetCore, option: u8, data: &[u8]) -> bool {
        let _ = (core, option, data);
        false
    }
}

/// Drives the RFC 854 byte state machine and RFC 1143 Q-method negotiation,
/// delegating option-specific policy to a registered chain of
/// `TelnetDelegate`s.
pub struct TelnetHandler {
    core: TelnetCore,
    delegates: Vec<Box<dyn TelnetDelegate>>,
    receiver: Receiver,
    state: TelnetState,
    app_data_buffer: Vec<u8>,
    received_command_byte: Option<u8>,
    received_subnegotiation_bytes: Vec<u8>,
}

impl TelnetHandler {
    /// Builds a handler with no delegates registered. Use [`Self::add_delegate`]
    /// to wire up Charset/NAWS/GMCP/MCCP or any other option-specific policy.
    pub fn new(is_client: bool, writer: Writer, receiver: Receiver) -> Self {
        Self {
            core: TelnetCore::new(is_client, writer),
            delegates: Vec::new(),
            receiver,
            state: TelnetState::Data,
            app_data_buffer: Vec::new(),
            received_command_byte: None,
            received_subnegotiation_bytes: Vec::new(),
        }
    }

    /// Appends a delegate to the negotiation chain. Order matters: earlier
    /// delegates get first refusal on any option they claim.
    pub fn add_delegate(&mut self, delegate: Box<dyn TelnetDelegate>) {
        self.delegates.push(delegate);
    }

    /// Read-only access to shared negotiation state, for tests and callers
    /// that want to inspect option state without going through a delegate.
    pub fn core(&self) -> &TelnetCore {
        &self.core
    }

    /// Offers to enable a locally managed option.
    pub fn will(&mut self, option: u8) {
        self.core.will(option);
    }

    /// Offers to disable a locally managed option.
    pub fn wont(&mut self, option: u8) {
        self.core.wont(option);
    }

    /// Requests that the peer enable a remotely managed option.
    pub fn do_(&mut self, option: u8) {
        self.core.do_(option);
    }

    /// Requests that the peer disable a remotely managed option.
    pub fn dont(&mut self, option: u8) {
        self.core.dont(option);
    }

    /// Sends a subnegotiation payload for `option`.
    pub fn request_negotiation(&mut self, option: u8, data: &[u8]) {
        self.core.request_negotiation(option, data);
    }

    fn flush_app_data(&mut self) {
        if !self.app_data_buffer.is_empty() {
            let data = std::mem::take(&mut self.app_data_buffer);
            (self.receiver)(&data);
        }
    }

    fn process_data_byte(&mut self, byte: u8) {
        match byte {
            IAC => self.state = TelnetState::Command,
            CR => self.state = TelnetState::Newline,
            other => self.app_data_buffer.push(other),
        }
    }

    fn process_newline_byte(&mut self, byte: u8) {
        self.state = TelnetState::Data;
        match byte {
            LF => self.app_data_buffer.push(LF),
            NUL => self.app_data_buffer.push(CR),
            IAC => {
                // CR immediately followed by IAC: deliver the CR as data and
                // let the command byte drive the state machine as usual.
                self.app_data_buffer.push(CR);
                self.state = TelnetState::Command;
            }
            other => {
                self.app_data_buffer.push(CR);
                self.app_data_buffer.push(other);
            }
        }
    }

    fn process_command_byte(&mut self, byte: u8) {
        if byte == IAC {
            self.app_data_buffer.push(IAC);
            self.state = TelnetState::Data;
        } else if byte == SE {
            tracing::warn!("IAC SE received outside of subnegotiation");
            self.state = TelnetState::Data;
        } else if byte == SB {
            self.received_subnegotiation_bytes.clear();
            self.state = TelnetState::Subnegotiation;
        } else if COMMAND_BYTES.contains(&byte) {
            self.state = TelnetState::Data;
            self.flush_app_data();
            tracing::debug!(command = describe_option(byte).unwrap_or("?"), "received bare command");
            self.on_command(byte, None);
        } else if NEGOTIATION_BYTES.contains(&byte) {
            self.received_command_byte = Some(byte);
            self.state = TelnetState::Negotiation;
        } else {
            tracing::warn!(byte, "unknown telnet command received");
            self.state = TelnetState::Data;
        }
    }

    fn process_negotiation_byte(&mut self, byte: u8) {
        self.state = TelnetState::Data;
        let command = self
            .received_command_byte
            .take()
            .expect("TelnetState::Negotiation implies a pending command byte");
        self.flush_app_data();
        self.on_command(command, Some(byte));
    }

    fn process_subnegotiation_byte(&mut self, byte: u8) {
        if byte == IAC {
            self.state = TelnetState::SubnegotiationEscaped;
        } else {
            self.received_subnegotiation_bytes.push(byte);
        }
    }

    fn process_subnegotiation_escaped_byte(&mut self, byte: u8) {
        if byte == SE {
            self.state = TelnetState::Data;
            self.flush_app_data();
            if self.received_subnegotiation_bytes.is_empty() {
                tracing::warn!("empty subnegotiation received");
                return;
            }
            let bytes = std::mem::take(&mut self.received_subnegotiation_bytes);
            let (&option, data) = bytes.split_first().expect("checked non-empty above");
            let data = data.to_vec();
            self.on_subnegotiation(option, &data);
        } else {
            // A doubled IAC inside a subnegotiation payload: keep the
            // literal 0xFF and resume accumulating.
            self.received_subnegotiation_bytes.push(byte);
            self.state = TelnetState::Subnegotiation;
        }
    }

    fn on_command(&mut self, command: u8, option: Option<u8>) {
        match command {
            WILL => self.on_will(option.expect("WILL always carries an option byte")),
            WONT => self.on_wont(option.expect("WONT always carries an option byte")),
            DO => self.on_do(option.expect("DO always carries an option byte")),
            DONT => self.on_dont(option.expect("DONT always carries an option byte")),
            _ => tracing::trace!(command, ?option, "unhandled bare telnet command"),
        }
    }

    fn on_subnegotiation(&mut self, option: u8, data: &[u8]) {
        if !self.dispatch_subnegotiation(option, data) {
            tracing::debug!(option = describe_option(option).unwrap_or("?"), "unhandled subnegotiation");
        }
    }

    fn dispatch_enable_local(&mut self, option: u8) -> bool {
        let mut delegates = std::mem::take(&mut self.delegates);
        let mut result = false;
        for delegate in delegates.iter_mut() {
            if let Some(decision) = delegate.on_enable_local(&mut self.core, option) {
                result = decision;
                break;
            }
        }
        self.delegates = delegates;
        result
    }

    fn dispatch_disable_local(&mut self, option: u8) {
        let mut delegates = std::mem::take(&mut self.delegates);
        let mut handled = false;
        for delegate in delegates.iter_mut() {
            if delegate.on_disable_local(&mut self.core, option) {
                handled = true;
                break;
            }
        }
        self.delegates = delegates;
        if !handled {
            tracing::warn!(option, "no delegate claimed cleanup for disabled local option");
        }
    }

    fn dispatch_enable_remote(&mut self, option: u8) -> bool {
        let mut delegates = std::mem::take(&mut self.delegates);
        let mut result = false;
        for delegate in delegates.iter_mut() {
            if let Some(decision) = delegate.on_enable_remote(&mut self.core, option) {
                result = decision;
                break;
            }
        }
        self.delegates = delegates;
        result
    }

    fn dispatch_disable_remote(&mut self, option: u8) {
        let mut delegates = std::mem::take(&mut self.delegates);
        let mut handled = false;
        for delegate in delegates.iter_mut() {
            if delegate.on_disable_remote(&mut self.core, option) {
                handled = true;
                break;
            }
        }
        self.delegates = delegates;
        if !handled {
            tracing::warn!(option, "no delegate claimed cleanup for disabled remote option");
        }
    }

    fn dispatch_option_enabled(&mut self, option: u8) {
        let mut delegates = std::mem::take(&mut self.delegates);
        for delegate in delegates.iter_mut() {
            if delegate.on_option_enabled(&mut self.core, option) {
                break;
            }
        }
        self.delegates = delegates;
    }

    fn dispatch_subnegotiation(&mut self, option: u8, data: &[u8]) -> bool {
        let mut delegates = std::mem::take(&mut self.delegates);
        let mut handled = false;
        for delegate in delegates.iter_mut() {
            if delegate.on_subnegotiation(&mut self.core, option, data) {
                handled = true;
                break;
            }
        }
        self.delegates = delegates;
        handled
    }

    /// `IAC WILL <option>`: the peer offers to enable, or confirms enabling,
    /// an option it manages. See RFC 1143's Q-method truth table.
    fn on_will(&mut self, option: u8) {
        let snapshot = *self.core.options.get_or_init(option);
        if !snapshot.him.enabled && !snapshot.him.negotiating {
            if self.dispatch_enable_remote(option) {
                self.core.options.get_or_init(option).him.enabled = true;
                self.core.send_do(option);
                self.dispatch_option_enabled(option);
            } else {
                self.core.send_dont(option);
            }
        } else if !snapshot.him.enabled && snapshot.him.negotiating {
            {
                let state = self.core.options.get_or_init(option);
                state.him.enabled = true;
                state.him.negotiating = false;
            }
            if !self.dispatch_enable_remote(option) {
                tracing::error!(option, "policy refused option after peer agreed to enable it");
                panic!("on_enable_remote must accept an option the peer just agreed to enable (option {option:#04x})");
            }
            self.dispatch_option_enabled(option);
        } else if snapshot.him.enabled && !snapshot.him.negotiating {
            // Peer unilaterally re-offers an already-enabled option. Ignore.
        } else {
            tracing::error!(option, "invariant violation: him.enabled and him.negotiating both set");
            panic!("option state may not have both enabled and negotiating set (option {option:#04x}, perspective him)");
        }
    }

    /// `IAC WONT <option>`: the peer refuses, or demands disabling, an
    /// option it manages.
    fn on_wont(&mut self, option: u8) {
        let snapshot = *self.core.options.get_or_init(option);
        if !snapshot.him.enabled && !snapshot.him.negotiating {
            // Peer insists an already-disabled option stay disabled. Ignore.
        } else if !snapshot.him.enabled && snapshot.him.negotiating {
            self.core.options.get_or_init(option).him.negotiating = false;
            tracing::debug!(
                option = describe_option(option).unwrap_or("?"),
                "peer refuses to enable option in response to our request"
            );
        } else if snapshot.him.enabled && !snapshot.him.negotiating {
            self.core.options.get_or_init(option).him.enabled = false;
            self.dispatch_disable_remote(option);
            self.core.send_dont(option);
        } else {
            {
                let state = self.core.options.get_or_init(option);
                state.him.enabled = false;
                state.him.negotiating = false;
            }
            self.dispatch_disable_remote(option);
        }
    }

    /// `IAC DO <option>`: the peer asks us to enable, or confirms we may
    /// enable, an option we manage.
    fn on_do(&mut self, option: u8) {
        let snapshot = *self.core.options.get_or_init(option);
        if !snapshot.us.enabled && !snapshot.us.negotiating {
            if self.dispatch_enable_local(option) {
                self.core.options.get_or_init(option).us.enabled = true;
                self.core.send_will(option);
                self.dispatch_option_enabled(option);
            } else {
                self.core.send_wont(option);
            }
        } else if !snapshot.us.enabled && snapshot.us.negotiating {
            {
                let state = self.core.options.get_or_init(option);
                state.us.enabled = true;
                state.us.negotiating = false;
            }
            // Decision already committed to by our own request; the policy
            // callback runs for side effects only here, matching upstream.
            self.dispatch_enable_local(option);
            self.dispatch_option_enabled(option);
        } else if snapshot.us.enabled && !snapshot.us.negotiating {
            // Peer asks us to enable an already-enabled option. Ignore.
        } else {
            tracing::error!(option, "invariant violation: us.enabled and us.negotiating both set");
            panic!("option state may not have both enabled and negotiating set (option {option:#04x}, perspective us)");
        }
    }

    /// `IAC DONT <option>`: the peer refuses, or demands disabling, an
    /// option we manage.
    fn on_dont(&mut self, option: u8) {
        let snapshot = *self.core.options.get_or_init(option);
        if !snapshot.us.enabled && !snapshot.us.negotiating {
            // Peer insists an already-disabled option stay disabled. Ignore.
        } else if !snapshot.us.enabled && snapshot.us.negotiating {
            self.core.options.get_or_init(option).us.negotiating = false;
            tracing::debug!(option = describe_option(option).unwrap_or("?"), "peer rejects our offer to enable option");
        } else if snapshot.us.enabled && !snapshot.us.negotiating {
            self.core.options.get_or_init(option).us.enabled = false;
            self.dispatch_disable_local(option);
            self.core.send_wont(option);
        } else {
            {
                let state = self.core.options.get_or_init(option);
                state.us.enabled = false;
                state.us.negotiating = false;
            }
            self.dispatch_disable_local(option);
        }
    }
}

impl ConnectionInterface for TelnetHandler {
    fn is_client(&self) -> bool {
        self.core.is_client()
    }

    fn write(&mut self, data: &[u8]) {
        self.core.write(data);
    }

    fn on_data_received(&mut self, data: &[u8]) {
        for &byte in data {
            match self.state {
                TelnetState::Data => self.process_data_byte(byte),
                TelnetState::Command => self.process_command_byte(byte),
                TelnetState::Negotiation => self.process_negotiation_byte(byte),
                TelnetState::Newline => self.process_newline_byte(byte),
                TelnetState::Subnegotiation => self.process_subnegotiation_byte(byte),
                TelnetState::SubnegotiationEscaped => self.process_subnegotiation_escaped_byte(byte),
            }
        }
        self.flush_app_data();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sink() -> (Writer, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&buf);
        let writer: Writer = Box::new(move |data: &[u8]| captured.lock().unwrap().extend_from_slice(data));
        (writer, buf)
    }

    fn receiver() -> (Receiver, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&buf);
        let recv: Receiver = Box::new(move |data: &[u8]| captured.lock().unwrap().extend_from_slice(data));
        (recv, buf)
    }

    #[test]
    fn plain_data_passes_through() {
        let (writer, _sent) = sink();
        let (recv, received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        handler.on_data_received(b"hello world");
        assert_eq!(&*received.lock().unwrap(), b"hello world");
    }

    #[test]
    fn escaped_iac_is_delivered_as_single_byte() {
        let (writer, _sent) = sink();
        let (recv, received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        handler.on_data_received(&[b'a', IAC, IAC, b'b']);
        assert_eq!(&*received.lock().unwrap(), &[b'a', IAC, b'b']);
    }

    #[test]
    fn crlf_is_canonicalized_to_lf() {
        let (writer, _sent) = sink();
        let (recv, received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        handler.on_data_received(b"one\r\ntwo");
        assert_eq!(&*received.lock().unwrap(), b"one\ntwo");
    }

    #[test]
    fn cr_nul_is_canonicalized_to_bare_cr() {
        let (writer, _sent) = sink();
        let (recv, received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        handler.on_data_received(&[b'x', CR, NUL, b'y']);
        assert_eq!(&*received.lock().unwrap(), &[b'x', CR, b'y']);
    }

    #[test]
    fn byte_by_byte_feeding_matches_bulk_feeding() {
        let input: &[u8] = &[b'a', IAC, IAC, CR, LF, b'b', CR, NUL, b'c'];
        let (writer, _) = sink();
        let (recv, bulk) = receiver();
        let mut bulk_handler = TelnetHandler::new(true, writer, recv);
        bulk_handler.on_data_received(input);

        let (writer, _) = sink();
        let (recv, piecewise) = receiver();
        let mut piecewise_handler = TelnetHandler::new(true, writer, recv);
        for &byte in input {
            piecewise_handler.on_data_received(&[byte]);
        }
        assert_eq!(&*bulk.lock().unwrap(), &*piecewise.lock().unwrap());
    }

    #[test]
    fn unsolicited_will_is_refused_without_a_delegate() {
        let (writer, sent) = sink();
        let (recv, _received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        handler.on_data_received(&[IAC, WILL, crate::constants::CHARSET]);
        assert_eq!(&*sent.lock().unwrap(), &[IAC, DONT, crate::constants::CHARSET]);
    }

    struct AcceptAll(u8);
    impl TelnetDelegate for AcceptAll {
        fn on_enable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
            (option == self.0).then_some(true)
        }
    }

    #[test]
    fn delegate_accepting_enable_remote_sends_do_and_fires_option_enabled() {
        let (writer, sent) = sink();
        let (recv, _received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        handler.add_delegate(Box::new(AcceptAll(crate::constants::GMCP)));
        handler.on_data_received(&[IAC, WILL, crate::constants::GMCP]);
        assert_eq!(&*sent.lock().unwrap(), &[IAC, DO, crate::constants::GMCP]);
        assert!(handler.core().is_enabled_remote(crate::constants::GMCP));
    }

    #[test]
    fn subnegotiation_with_escaped_iac_is_reassembled() {
        let (writer, _sent) = sink();
        let (recv, _received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        struct Capture(Arc<Mutex<Vec<u8>>>);
        impl TelnetDelegate for Capture {
            fn on_subnegotiation(&mut self, _core: &mut TelnetCore, option: u8, data: &[u8]) -> bool {
                if option == crate::constants::GMCP {
                    self.0.lock().unwrap().extend_from_slice(data);
                    true
                } else {
                    false
                }
            }
        }
        let captured = Arc::new(Mutex::new(Vec::new()));
        handler.add_delegate(Box::new(Capture(Arc::clone(&captured))));
        handler.on_data_received(&[IAC, SB, crate::constants::GMCP, b'a', IAC, IAC, b'b', IAC, SE]);
        assert_eq!(&*captured.lock().unwrap(), &[b'a', IAC, b'b']);
    }

    #[test]
    fn will_on_already_enabled_option_is_a_noop() {
        let (writer, sent) = sink();
        let (recv, _received) = receiver();
        let mut handler = TelnetHandler::new(true, writer, recv);
        handler.will(crate::constants::SGA);
        sent.lock().unwrap().clear();
        handler.on_data_received(&[IAC, DO, crate::constants::SGA]);
        sent.lock().unwrap().clear();
        handler.will(crate::constants::SGA);
        assert!(sent.lock().unwrap().is_empty());
    }
}
