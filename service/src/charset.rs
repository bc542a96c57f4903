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

//! Charset (RFC 2066): negotiates a text charset over a Telnet
//! subnegotiation. We follow the "server proposes, client
//! confirms" handshake direction: the client never requests `CHARSET` on
//! connect.
//!
//! Codec lookups go through a small static alias table covering the
//! charsets MUME actually offers, rather than a full system codec registry.

use mudproto_telnet::constants::{CHARSET, CHARSET_ACCEPTED, CHARSET_REJECTED, CHARSET_REQUEST};
use mudproto_telnet::telnet::{TelnetCore, TelnetDelegate};

/// Known charset name, alongside its common aliases. The first entry in
/// `aliases` is the canonical name.
const CHARSET_ALIASES: &[&[&str]] = &[
    &["US-ASCII", "ASCII", "US", "ANSI_X3.4-1968"],
    &["ISO-8859-1", "LATIN1", "LATIN-1", "L1", "ISO8859-1", "8859"],
    &["UTF-8", "UTF8", "U8"],
];

/// Resolves `name` to its canonical alias, case-insensitively. `None` if no
/// known charset matches.
pub fn canonical_charset(name: &str) -> Option<&'static str> {
    let upper = name.to_ascii_uppercase();
    CHARSET_ALIASES.iter().find_map(|group| group.iter().any(|alias| alias.eq_ignore_ascii_case(&upper)).then_some(group[0]))
}

/// Negotiates the Charset (option 0x2A) subnegotiation.
pub struct CharsetDelegate {
    is_client: bool,
    separator: u8,
    peer_supported: Vec<String>,
    accepted: Option<String>,
}

impl CharsetDelegate {
    /// Builds a delegate for the given role.
    pub fn new(is_client: bool) -> Self {
        Self { is_client, separator: b';', peer_supported: Vec::new(), accepted: None }
    }

    /// The charset the peer most recently accepted, if any.
    pub fn accepted(&self) -> Option<&str> {
        self.accepted.as_deref()
    }

    /// The deduplicated, alias-canonicalized list the peer declared support
    /// for in its most recent `CHARSET_REQUEST`.
    pub fn peer_supported(&self) -> &[String] {
        &self.peer_supported
    }

    /// Resolves `name` via the alias table and, if it appears in
    /// `peer_supported`, sends `CHARSET_REQUEST ; <item>`. Server role only;
    /// per this handshake's "server proposes, client confirms" direction the
    /// client never originates a `CHARSET_REQUEST`.
    pub fn negotiate_charset(&mut self, core: &mut TelnetCore, name: &str) {
        if self.is_client {
            tracing::warn!(charset = name, "negotiate_charset: client role never originates CHARSET_REQUEST");
            return;
        }
        let Some(canonical) = canonical_charset(name) else {
            tracing::warn!(charset = name, "negotiate_charset: unknown charset");
            return;
        };
        if let Some(item) = self.peer_supported.iter().find(|s| s.as_str() == canonical) {
            let mut payload = vec![CHARSET_REQUEST, self.separator];
            payload.extend_from_slice(item.as_bytes());
            core.request_negotiation(CHARSET, &payload);
        } else {
            tracing::warn!(charset = canonical, "peer does not support this charset");
        }
    }
}

impl TelnetDelegate for CharsetDelegate {
    fn on_enable_local(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
        (option == CHARSET).then_some(true)
    }

    fn on_enable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
        (option == CHARSET).then_some(true)
    }

    fn on_disable_local(&mut self, _core: &mut TelnetCore, option: u8) -> bool {
        option == CHARSET
    }

    fn on_disable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> bool {
        option == CHARSET
    }

    fn on_subnegotiation(&mut self, _core: &mut TelnetCore, option: u8, data: &[u8]) -> bool {
        if option != CHARSET {
            return false;
        }
        let Some((&sub_command, rest)) = data.split_first() else {
            tracing::warn!("empty CHARSET subnegotiation");
            return true;
        };
        match sub_command {
            CHARSET_REQUEST => {
                let Some((&separator, list)) = rest.split_first() else {
                    tracing::warn!("CHARSET_REQUEST missing separator byte");
                    return true;
                };
                self.separator = separator;
                let text = String::from_utf8_lossy(list);
                let mut seen = Vec::new();
                for item in text.split(separator as char) {
                    if item.is_empty() {
                        continue;
                    }
                    if let Some(canonical) = canonical_charset(item) {
                        if !seen.iter().any(|s: &String| s == canonical) {
                            seen.push(canonical.to_string());
                        }
                    }
                }
                self.peer_supported = seen;
                tracing::debug!(charsets = ?self.peer_supported, "peer CHARSET_REQUEST parsed");
                // Caller decides what to negotiate next by calling
                // negotiate_charset(current); we only record the list here,
                // as TelnetDelegate has no notion of "current charset".
            }
            CHARSET_ACCEPTED => {
                self.accepted = Some(String::from_utf8_lossy(rest).into_owned());
                tracing::debug!(charset = ?self.accepted, "peer accepted charset");
            }
            CHARSET_REJECTED => {
                tracing::warn!("peer rejected our CHARSET_REQUEST");
            }
            other => {
                tracing::warn!(sub_command = other, "unknown CHARSET sub-command");
            }
        }
        true
    }
}
