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

//! MCCP (Mud Client Compression Protocol, v1/v2): the decompression
//! splicer.
//!
//! This is split across two halves that share an `Arc<Mutex<McpState>>`:
//! [`MccpDelegate`], which negotiates options 85/86 as a `TelnetDelegate`
//! so it participates in the ordinary WILL/DO dance, and [`MccpHandler`], a
//! standalone `ConnectionInterface` the manager places below Telnet in the
//! chain so it sees raw bytes before Telnet's framing parser does. The
//! activation sentinel is itself a subnegotiation, but everything after it
//! is compressed and must never be fed through Telnet's byte parser
//! unparsed. Both halves are boxed as trait objects that require `Send`,
//! so the shared state uses `Arc<Mutex<_>>` rather than `Rc<RefCell<_>>`.

use flate2::{Decompress, FlushDecompress, Status};
use std::sync::{Arc, Mutex};

use mudproto_telnet::connection::{ConnectionInterface, Receiver, Writer};
use mudproto_telnet::constants::{IAC, MCCP1, MCCP2, SE, WILL};
use mudproto_telnet::telnet::{TelnetCore, TelnetDelegate};

/// MCCP1's historical activation sentinel: `IAC SB 0x55 WILL SE`. Note the
/// non-standard `WILL SE` close instead of `IAC SE`. This is deliberate and
/// must be matched exactly.
const MCCP1_ACTIVATION: [u8; 5] = [IAC, mudproto_telnet::constants::SB, MCCP1, WILL, SE];
/// MCCP2's activation sentinel: `IAC SB 0x56 IAC SE`.
const MCCP2_ACTIVATION: [u8; 4] = [IAC, mudproto_telnet::constants::SB, MCCP2, IAC];

/// Shared MCCP negotiation/decompression state.
#[derive(Default)]
pub struct McpState {
    /// Which MCCP version was negotiated on (if any).
    pub version: Option<u8>,
    /// Whether the compressed region is currently active.
    pub compression_enabled: bool,
    decompressor: Option<Decompress>,
}

/// Claims options 85 (MCCP1) and 86 (MCCP2) during Telnet negotiation.
/// Always accepts, recording the version in the shared state; actual
/// decompression is driven entirely by [`MccpHandler`].
pub struct MccpDelegate {
    state: Arc<Mutex<McpState>>,
}

impl MccpDelegate {
    pub(crate) fn new(state: Arc<Mutex<McpState>>) -> Self {
        Self { state }
    }
}

impl TelnetDelegate for MccpDelegate {
    fn on_enable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> Option<bool> {
        match option {
            MCCP1 => {
                self.state.lock().expect("MCCP state mutex poisoned").version = Some(1);
                Some(true)
            }
            MCCP2 => {
                self.state.lock().expect("MCCP state mutex poisoned").version = Some(2);
                Some(true)
            }
            _ => None,
        }
    }

    fn on_disable_remote(&mut self, _core: &mut TelnetCore, option: u8) -> bool {
        if option == MCCP1 || option == MCCP2 {
            let mut state = self.state.lock().expect("MCCP state mutex poisoned");
            state.version = None;
            state.compression_enabled = false;
            state.decompressor = None;
            true
        } else {
            false
        }
    }
}

/// Intercepts the raw byte stream below Telnet, splicing zlib
/// decompression in once the activation sentinel is seen.
pub struct MccpHandler {
    is_client: bool,
    writer: Writer,
    receiver: Receiver,
    state: Arc<Mutex<McpState>>,
    compressed_input_buffer: Vec<u8>,
}

impl MccpHandler {
    pub(crate) fn new(is_client: bool, writer: Writer, receiver: Receiver, state: Arc<Mutex<McpState>>) -> Self {
        Self { is_client, writer, receiver, state, compressed_input_buffer: Vec::new() }
    }

    fn forward(&mut self, data: &[u8]) {
        if !data.is_empty() {
            (self.receiver)(data);
        }
    }

    /// Runs the splice state machine to completion against the
    /// current `compressed_input_buffer`, forwarding decompressed or
    /// passthrough bytes as it goes.
    fn drain(&mut self) {
        loop {
            let compression_enabled = self.state.lock().expect("MCCP state mutex poisoned").compression_enabled;
            if compression_enabled {
                if self.compressed_input_buffer.is_empty() {
                    return;
                }
                let input = std::mem::take(&mut self.compressed_input_buffer);
                let mut output = vec![0u8; (input.len() * 4).max(256)];
                let (consumed, produced, stream_ended) = {
                    let mut state = self.state.lock().expect("MCCP state mutex poisoned");
                    let decompressor = state.decompressor.as_mut().expect("compression_enabled implies a live decompressor");
                    let before_in = decompressor.total_in();
                    let before_out = decompressor.total_out();
                    let status = match decompressor.decompress(&input, &mut output, FlushDecompress::None) {
                        Ok(status) => status,
                        Err(err) => {
                            tracing::error!(error = %err, "MCCP zlib decompression failed");
                            panic!("fatal MCCP decompression failure: {err}");
                        }
                    };
                    let consumed = (decompressor.total_in() - before_in) as usize;
                    let produced = (decompressor.total_out() - before_out) as usize;
                    (consumed, produced, status == Status::StreamEnd)
                };
                self.forward(&output[..produced]);
                if stream_ended {
                    tracing::debug!("MCCP stream ended mid-connection, reverting to uncompressed");
                    let leftover = input[consumed..].to_vec();
                    let mut state = self.state.lock().expect("MCCP state mutex poisoned");
                    state.compression_enabled = false;
                    state.decompressor = None;
                    state.version = None;
                    drop(state);
                    self.compressed_input_buffer = leftover;
                    continue;
                }
                if consumed < input.len() {
                    // Decompressor wants more output room before consuming
                    // the rest; put it back and grow next time around.
                    self.compressed_input_buffer = input[consumed..].to_vec();
                    continue;
                }
                return;
            }

            let version = self.state.lock().expect("MCCP state mutex poisoned").version;
            let Some(_version) = version else {
                self.forward(&std::mem::take(&mut self.compressed_input_buffer));
                return;
            };

            let Some(iac_pos) = self.compressed_input_buffer.iter().position(|&b| b == IAC) else {
                self.forward(&std::mem::take(&mut self.compressed_input_buffer));
                return;
            };
            let prefix: Vec<u8> = self.compressed_input_buffer.drain(..iac_pos).collect();
            self.forward(&prefix);

            if self.compressed_input_buffer.starts_with(&MCCP1_ACTIVATION) {
                self.compressed_input_buffer.drain(..MCCP1_ACTIVATION.len());
                self.activate_compression();
                continue;
            }
            if self.compressed_input_buffer.starts_with(&MCCP2_ACTIVATION) {
                // MCCP2_ACTIVATION already ends at the `IAC` of `IAC SE`;
                // consume the trailing SE too.
                if self.compressed_input_buffer.get(MCCP2_ACTIVATION.len()) == Some(&SE) {
                    self.compressed_input_buffer.drain(..MCCP2_ACTIVATION.len() + 1);
                    self.activate_compression();
                    continue;
                }
            }
            // Not (yet) a recognized activation sentinel. If we don't have
            // enough bytes buffered to tell, wait for more.
            if self.compressed_input_buffer.len() < MCCP1_ACTIVATION.len().max(MCCP2_ACTIVATION.len() + 1) {
                let partial_matches_mccp1 = MCCP1_ACTIVATION.starts_with(&self.compressed_input_buffer);
                let partial_matches_mccp2 = MCCP2_ACTIVATION.starts_with(&self.compressed_input_buffer.iter().take(MCCP2_ACTIVATION.len()).copied().collect::<Vec<_>>());
                if partial_matches_mccp1 || partial_matches_mccp2 {
                    return;
                }
            }
            // Unknown IAC sequence (or a 2-byte command): forward one byte
            // and keep scanning so we make progress.
            if let Some(first) = self.compressed_input_buffer.first().copied() {
                self.forward(&[first]);
                self.compressed_input_buffer.remove(0);
            } else {
                return;
            }
        }
    }

    fn activate_compression(&mut self) {
        let mut state = self.state.lock().expect("MCCP state mutex poisoned");
        state.compression_enabled = true;
        state.decompressor = Some(Decompress::new(true));
        tracing::debug!(version = ?state.version, "MCCP compression activated");
    }
}

impl ConnectionInterface for MccpHandler {
    fn is_client(&self) -> bool {
        self.is_client
    }

    fn write(&mut self, data: &[u8]) {
        (self.writer)(data);
    }

    fn on_data_received(&mut self, data: &[u8]) {
        self.compressed_input_buffer.extend_from_slice(data);
        self.drain();
    }
}
