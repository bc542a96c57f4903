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

//! NAWS (RFC 1073): 16-bit window dimension round-trip.

use mudproto_telnet::constants::NAWS;
use mudproto_telnet::telnet::{TelnetCore, TelnetDelegate};

/// A window width/height pair, both constrained to 0-65535 by the wire
/// format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    /// Terminal width in columns.
    pub width: u16,
    /// Terminal height in rows.
    pub height: u16,
}

/// Negotiates and tracks NAWS. On the client side, `set_dimensions` sends
/// the 4-byte payload; on the server side, received payloads update
/// `dimensions`.
pub struct NawsDelegate {
    is_client: bool,
    dimensions: Dimensions,
}

impl NawsDelegate {
    /// Builds a delegate for the given role. Neither side auto-offers NAWS;
    /// the owning application calls `TelnetHandler::do_`/`will` as usual.
    pub fn new(is_client: bool) -> Self {
        Self { is_client, dimensions: Dimensions::default() }
    }

    /// Builds a client-role delegate that already knows the terminal's
    /// dimensions, so they go out in the very first post-enable
    /// subnegotiation instead of a stale `(0, 0)`.
    pub fn with_dimensions(is_client: bool, dimensions: Dimensions) -> Self {
        Self { is_client, dimensions }
    }

    /// The last dimensions received from (server role) or sent to (client
    /// role) the peer.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Client role only: records the new dimensions and sends
    /// `IAC SB NAWS <w-hi><w-lo><h-hi><h-lo> IAC SE` if the option is
    /// currently enabled locally.
    pub fn set_dimensions(&mut self, core: &mut TelnetCore, dimensions: Dimensions) {
        self.dimensions = dimensions;
        if self.is_client && core.is_enabled_local(NAWS) {
            core.request_negotiation(NAWS, &encode(dimensions));
        }
    }
}

fn encode(dimensions: Dimensions) -> [u8; 4] {
    let [wh, wl] = dimensions.width.to_be_bytes();
    let [hh, hl] = dimensions.height.to_be_bytes();
    [wh, wl, hh, hl]
}

impl TelnetDelegate for NawsDelegate {
    fn on_enable_local(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
        (option == NAWS).then_some(true)
    }

    fn on_enable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
        (option == NAWS).then_some(true)
    }

    fn on_disable_local(&mut self, _core: &mut TelnetCore, option: u8) -> bool {
        option == NAWS
    }

    fn on_disable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> bool {
        option == NAWS
    }

    fn on_option_enabled(&mut self, core: &mut TelnetCore, option: u8) -> bool {
        if option != NAWS {
            return false;
        }
        if self.is_client {
            core.request_negotiation(NAWS, &encode(self.dimensions));
        }
        true
    }

    fn on_subnegotiation(&mut self, _core: &mut TelnetCore, option: u8, data: &[u8]) -> bool {
        if option != NAWS {
            return false;
        }
        if data.len() != 4 {
            tracing::warn!(len = data.len(), "malformed NAWS payload, expected 4 bytes");
            return true;
        }
        self.dimensions = Dimensions {
            width: u16::from_be_bytes([data[0], data[1]]),
            height: u16::from_be_bytes([data[2], data[3]]),
        };
        tracing::debug!(width = self.dimensions.width, height = self.dimensions.height, "NAWS dimensions updated");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudproto_telnet::connection::{ConnectionInterface, Receiver, Writer};
    use mudproto_telnet::constants::{DO, IAC, SB, SE};
    use mudproto_telnet::telnet::TelnetHandler;
    use std::sync::{Arc, Mutex};

    fn sink() -> (Writer, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&buf);
        let writer: Writer = Box::new(move |data: &[u8]| captured.lock().unwrap().extend_from_slice(data));
        (writer, buf)
    }

    fn receiver() -> Receiver {
        Box::new(|_data: &[u8]| {})
    }

    #[test]
    fn client_sends_dimensions_once_enabled() {
        let (writer, sent) = sink();
        let mut handler = TelnetHandler::new(true, writer, receiver());
        handler.add_delegate(Box::new(NawsDelegate::with_dimensions(true, Dimensions { width: 80, height: 25 })));
        handler.will(NAWS);
        sent.lock().unwrap().clear();
        handler.on_data_received(&[IAC, DO, NAWS]);
        assert_eq!(&*sent.lock().unwrap(), &[IAC, SB, NAWS, 0x00, 0x50, 0x00, 0x19, IAC, SE]);
    }

    #[test]
    fn server_parses_four_byte_payload() {
        let (writer, _sent) = sink();
        let mut handler = TelnetHandler::new(false, writer, receiver());
        let dims = Arc::new(Mutex::new(Dimensions::default()));
        struct Capture(Arc<Mutex<Dimensions>>);
        impl TelnetDelegate for Capture {
            fn on_enable_remote(&mut self, _c: &mut TelnetCore, o: u8) -> Option<bool> {
                (o == NAWS).then_some(true)
            }
            fn on_subnegotiation(&mut self, _c: &mut TelnetCore, o: u8, data: &[u8]) -> bool {
                if o != NAWS || data.len() != 4 {
                    return o == NAWS;
                }
                *self.0.lock().unwrap() = Dimensions { width: u16::from_be_bytes([data[0], data[1]]), height: u16::from_be_bytes([data[2], data[3]]) };
                true
            }
        }
        handler.add_delegate(Box::new(Capture(Arc::clone(&dims))));
        handler.on_data_received(&[IAC, mudproto_telnet::constants::WILL, NAWS]);
        handler.on_data_received(&[IAC, SB, NAWS, 0x00, 0x50, 0x00, 0x19, IAC, SE]);
        assert_eq!(*dims.lock().unwrap(), Dimensions { width: 80, height: 25 });
    }
}
