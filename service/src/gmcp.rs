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

//! GMCP (Generic Mud Communication Protocol, option 0xC9): JSON payloads
//! over subnegotiation, the `Core.Hello` handshake, and `Core.Supports.*`
//! package bookkeeping.

use regex::Regex;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use mudproto_telnet::constants::GMCP;
use mudproto_telnet::telnet::{TelnetCore, TelnetDelegate};

/// The `{client, version}` pair a client-role handler announces in its
/// `Core.Hello`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GmcpClientInfo {
    /// Client name, e.g. `"mume-rust-client"`.
    pub client: String,
    /// Client version string.
    pub version: String,
}

fn message_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(?P<package>[\w.-]+)\s*(?P<value>.*?)\s*$").expect("static GMCP pattern is valid"))
}

/// One parsed GMCP message: a dotted package name and its JSON value (may
/// be absent, e.g. a bare `Core.Ping`).
#[derive(Clone, Debug, PartialEq)]
pub struct GmcpMessage {
    /// Dotted package/message name, e.g. `"Char.Vitals"`.
    pub package: String,
    /// The JSON payload, `Value::Null` if none was sent.
    pub value: Value,
}

/// Parses a `"<Package.Name> <JSON-value>"` GMCP message body.
pub fn parse_message(data: &[u8]) -> Option<GmcpMessage> {
    let text = std::str::from_utf8(data).ok()?;
    let captures = message_pattern().captures(text)?;
    let package = captures.name("package")?.as_str().to_string();
    let value_text = captures.name("value").map(|m| m.as_str()).unwrap_or("");
    let value = if value_text.is_empty() { Value::Null } else { serde_json::from_str(value_text).unwrap_or(Value::String(value_text.to_string())) };
    Some(GmcpMessage { package, value })
}

/// Serializes a `GmcpMessage` back to wire format.
pub fn encode_message(package: &str, value: &Value) -> Vec<u8> {
    let mut out = package.as_bytes().to_vec();
    if !value.is_null() {
        out.push(b' ');
        out.extend_from_slice(serde_json::to_string(value).unwrap_or_default().as_bytes());
    }
    out
}

/// Negotiates GMCP (option 0xC9): the `Core.Hello` handshake and
/// `Core.Supports.Set/Add/Remove` package bookkeeping.
pub struct GmcpDelegate {
    is_client: bool,
    client_info: GmcpClientInfo,
    is_initialized: bool,
    /// Lowercase package name -> version.
    supported_packages: BTreeMap<String, u32>,
    /// Every message received, for tests/introspection; the real dispatch
    /// happens through a caller-supplied callback in a full application.
    on_message: Option<Box<dyn FnMut(GmcpMessage) + Send>>,
}

impl GmcpDelegate {
    /// Builds a delegate for the given role, announcing `client_info` in a
    /// client-role `Core.Hello`.
    pub fn new(is_client: bool, client_info: GmcpClientInfo) -> Self {
        Self { is_client, client_info, is_initialized: false, supported_packages: BTreeMap::new(), on_message: None }
    }

    /// Installs a callback invoked for every parsed GMCP message (after the
    /// `Core.Hello` handshake, if acting as a server, has been checked).
    pub fn set_on_message(&mut self, callback: Box<dyn FnMut(GmcpMessage) + Send>) {
        self.on_message = Some(callback);
    }

    /// True once the server-role `Core.Hello` handshake has completed, or
    /// always true client-side (the client has nothing to wait for).
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    /// The client's own registered package set, lowercase name -> version.
    pub fn supported_packages(&self) -> &BTreeMap<String, u32> {
        &self.supported_packages
    }

    fn send_hello(&self, core: &mut TelnetCore) {
        let value = json!({"client": self.client_info.client, "version": self.client_info.version});
        core.request_negotiation(GMCP, &encode_message("Core.Hello", &value));
    }

    /// Replaces the entire registered package set and sends
    /// `Core.Supports.Set`.
    pub fn gmcp_set_packages(&mut self, core: &mut TelnetCore, packages: &[(String, u32)]) {
        self.supported_packages = packages.iter().map(|(name, version)| (name.to_ascii_lowercase(), *version)).collect();
        self.send_supports(core, "Core.Supports.Set", packages);
    }

    /// Adds packages to the registered set and sends `Core.Supports.Add`.
    pub fn gmcp_add_packages(&mut self, core: &mut TelnetCore, packages: &[(String, u32)]) {
        for (name, version) in packages {
            self.supported_packages.insert(name.to_ascii_lowercase(), *version);
        }
        self.send_supports(core, "Core.Supports.Add", packages);
    }

    /// Removes packages from the registered set and sends
    /// `Core.Supports.Remove`. Removing an unregistered package logs a
    /// warning and is otherwise a no-op.
    pub fn gmcp_remove_packages(&mut self, core: &mut TelnetCore, names: &[String]) {
        for name in names {
            if self.supported_packages.remove(&name.to_ascii_lowercase()).is_none() {
                tracing::warn!(package = name, "gmcp_remove_packages: package was not registered");
            }
        }
        let values: Vec<Value> = names.iter().map(|name| Value::String(name.clone())).collect();
        core.request_negotiation(GMCP, &encode_message("Core.Supports.Remove", &Value::Array(values)));
    }

    fn send_supports(&self, core: &mut TelnetCore, package: &str, packages: &[(String, u32)]) {
        let values: Vec<Value> = packages.iter().map(|(name, version)| Value::String(format!("{name} {version}"))).collect();
        core.request_negotiation(GMCP, &encode_message(package, &Value::Array(values)));
    }
}

impl TelnetDelegate for GmcpDelegate {
    fn on_enable_local(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
        (option == GMCP).then_some(true)
    }

    fn on_enable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
        (option == GMCP).then_some(true)
    }

    fn on_disable_local(&mut self, _core: &mut TelnetCore, option: u8) -> bool {
        option == GMCP
    }

    fn on_disable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> bool {
        option == GMCP
    }

    fn on_option_enabled(&mut self, core: &mut TelnetCore, option: u8) -> bool {
        if option != GMCP {
            return false;
        }
        if self.is_client && core.is_enabled_local(GMCP) {
            self.send_hello(core);
        }
        true
    }

    fn on_subnegotiation(&mut self, _core: &mut TelnetCore, option: u8, data: &[u8]) -> bool {
        if option != GMCP {
            return false;
        }
        let Some(message) = parse_message(data) else {
            tracing::warn!("malformed GMCP message, could not parse package/value");
            return true;
        };
        if self.is_client {
            self.is_initialized = true;
        } else if !self.is_initialized {
            if message.package.eq_ignore_ascii_case("Core.Hello") {
                self.is_initialized = true;
            } else {
                tracing::warn!(package = message.package, "GMCP message received before Core.Hello handshake");
            }
        }
        if let Some(callback) = self.on_message.as_mut() {
            callback(message);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudproto_telnet::connection::{ConnectionInterface, Receiver, Writer};
    use mudproto_telnet::constants::{DO, IAC, SB, SE, WILL};
    use mudproto_telnet::telnet::TelnetHandler;
    use std::sync::{Arc, Mutex};

    fn sink() -> (Writer, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&buf);
        let writer: Writer = Box::new(move |data: &[u8]| captured.lock().unwrap().extend_from_slice(data));
        (writer, buf)
    }

    fn receiver() -> Receiver {
        Box::new(|_: &[u8]| {})
    }

    #[test]
    fn parse_message_splits_package_and_json() {
        let msg = parse_message(b"Char.Vitals {\"hp\":100}").unwrap();
        assert_eq!(msg.package, "Char.Vitals");
        assert_eq!(msg.value, json!({"hp": 100}));
    }

    #[test]
    fn parse_message_handles_bare_package_with_no_value() {
        let msg = parse_message(b"Core.Ping").unwrap();
        assert_eq!(msg.package, "Core.Ping");
        assert_eq!(msg.value, Value::Null);
    }

    #[test]
    fn client_sends_core_hello_once_option_enabled() {
        let (writer, sent) = sink();
        let mut handler = TelnetHandler::new(true, writer, receiver());
        handler.add_delegate(Box::new(GmcpDelegate::new(true, GmcpClientInfo { client: "testclient".into(), version: "1.0".into() })));
        handler.will(GMCP);
        sent.lock().unwrap().clear();
        handler.on_data_received(&[IAC, DO, GMCP]);
        let sent = sent.lock().unwrap();
        let text = String::from_utf8_lossy(&sent);
        assert!(text.contains("Core.Hello"));
        assert!(text.contains("testclient"));
        assert_eq!(sent[0], IAC);
        assert_eq!(sent[1], SB);
        assert_eq!(*sent.last().unwrap(), SE);
    }

    #[test]
    fn server_warns_but_still_dispatches_message_before_hello() {
        let (writer, _sent) = sink();
        let mut handler = TelnetHandler::new(false, writer, receiver());
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let mut delegate = GmcpDelegate::new(false, GmcpClientInfo { client: "x".into(), version: "1".into() });
        delegate.set_on_message(Box::new(move |msg| received_clone.lock().unwrap().push(msg.package)));
        handler.add_delegate(Box::new(delegate));
        handler.on_data_received(&[IAC, WILL, GMCP]);
        handler.on_data_received(&[IAC, SB, GMCP]);
        handler.on_data_received(b"Char.Vitals {}");
        handler.on_data_received(&[IAC, SE]);
        assert_eq!(&*received.lock().unwrap(), &["Char.Vitals".to_string()]);
    }

    #[test]
    fn set_then_remove_unregistered_package_is_a_warned_noop() {
        // TelnetCore is only reachable from inside a dispatched delegate
        // callback, so drive gmcp_set_packages/gmcp_remove_packages through
        // a GMCP message handler that calls back into the delegate itself.
        struct Driver(GmcpDelegate, Vec<(String, u32)>, Vec<String>);
        impl TelnetDelegate for Driver {
            fn on_enable_local(&mut self, core: &mut TelnetCore, option: u8) -> Option<bool> {
                self.0.on_enable_local(core, option)
            }
            fn on_option_enabled(&mut self, core: &mut TelnetCore, option: u8) -> bool {
                if option != GMCP {
                    return false;
                }
                self.0.gmcp_set_packages(core, &self.1.clone());
                self.0.gmcp_remove_packages(core, &self.2.clone());
                true
            }
        }
        let (writer, sent) = sink();
        let mut handler = TelnetHandler::new(true, writer, receiver());
        let delegate = GmcpDelegate::new(true, GmcpClientInfo { client: "x".into(), version: "1".into() });
        handler.add_delegate(Box::new(Driver(delegate, vec![("char".into(), 1)], vec!["ghost".into()])));
        handler.will(GMCP);
        handler.on_data_received(&[IAC, DO, GMCP]);
        let text = String::from_utf8_lossy(&sent.lock().unwrap());
        assert!(text.contains("Core.Supports.Set"));
        assert!(text.contains("Core.Supports.Remove"));
    }
}
