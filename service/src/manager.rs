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

//! The handler-chain manager: life-cycle, pre-connection buffering, and the
//! construction/teardown of the protocol handler chain.
//!
//! Registration is per-[`HandlerSpec`] rather than per-class-with-kwargs (no
//! reflection in Rust), but the contract is the same: each spec constructs
//! exactly one handler, appended to the end of the chain, wired with
//! `writer = manager.write` and `receiver = <current terminal>`.
//!
//! Charset/NAWS/GMCP are not independent links in the chain. Like the
//! original mixin classes they are folded into, they only ever observe
//! Telnet option negotiation and subnegotiation payloads, so they are
//! attached as [`mudproto_telnet::TelnetDelegate`]s on the Telnet handler at
//! construction time instead of receiving their own slot. MCCP is split: its
//! negotiation half is a delegate (it claims options 85/86), but its byte
//! splicing half must see raw bytes before Telnet does, so it gets its own
//! slot below Telnet in the chain.

use crate::charset::CharsetDelegate;
use crate::error::{ManagerError, Result};
use crate::gmcp::{GmcpClientInfo, GmcpDelegate};
use crate::mccp::{McpState, MccpDelegate, MccpHandler};
use crate::mpi::{EditorLauncher, MpiHandler, MpiOutputFormat, ProcessEditorLauncher};
use crate::naws::NawsDelegate;
use crate::xml::{XmlHandler, XmlOutputFormat};
use mudproto_telnet::connection::{ConnectionInterface, Receiver, Writer};
use mudproto_telnet::bytes::escape_iac;
use mudproto_telnet::constants::{CR, IAC, GA, LF, NUL};
use mudproto_telnet::telnet::TelnetHandler;
use std::sync::{Arc, Mutex};

/// Which built-in handler to construct and append to the chain.
///
/// Registration order matters: it is also chain order, slot 0 closest to
/// the transport. The usual bottom-up order is `Mccp`, `Telnet`, then
/// optionally `Mpi` and/or `Xml`.
pub enum HandlerSpec {
    /// The Telnet core. `charset`/`naws`/`gmcp` select which mix-ins to
    /// attach as negotiation delegates; if an [`HandlerSpec::Mccp`] was
    /// registered earlier, its delegate half is attached automatically.
    Telnet {
        /// Attach the Charset (RFC 2066) delegate.
        charset: bool,
        /// Attach the NAWS (RFC 1073) delegate.
        naws: bool,
        /// Attach the GMCP delegate, identifying this client to the peer.
        gmcp: Option<GmcpClientInfo>,
    },
    /// The MCCP decompression splicer. Must be registered before `Telnet`
    /// for its delegate half to be attached; its handler half always sits
    /// at the slot it is registered at, which should be below Telnet.
    Mccp,
    /// The MPI remote-editing/viewing protocol.
    Mpi {
        /// `tintin` swaps the editor subprocess for a sentinel line
        /// protocol a client-side script can intercept.
        output_format: MpiOutputFormat,
        /// Collaborator that actually spawns the editor/pager. Defaults to
        /// [`ProcessEditorLauncher`] when not overridden by a caller who
        /// wants to stub it out for tests.
        launcher: Option<Arc<dyn EditorLauncher>>,
    },
    /// The MUME XML room/prompt/movement tag protocol.
    Xml {
        /// How recognized tags are rendered into the outgoing text stream.
        output_format: XmlOutputFormat,
    },
}

/// Identifies a registered handler for [`Manager::unregister`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    /// The Telnet core.
    Telnet,
    /// The MCCP decompression splicer.
    Mccp,
    /// The MPI remote-editing/viewing protocol.
    Mpi,
    /// The MUME XML tag protocol.
    Xml,
}

impl HandlerKind {
    fn name(self) -> &'static str {
        match self {
            HandlerKind::Telnet => "Telnet",
            HandlerKind::Mccp => "Mccp",
            HandlerKind::Mpi => "Mpi",
            HandlerKind::Xml => "Xml",
        }
    }
}

/// One entry in the handler chain: the `ConnectionInterface` itself, tagged
/// with its `HandlerKind` so `unregister` can find it and `register` can
/// reject duplicates.
struct ChainEntry {
    kind: HandlerKind,
    handler: Box<dyn ConnectionInterface>,
    /// Each handler's receiver closure writes into this buffer instead of
    /// recursively calling the next handler directly. Recursing back into
    /// the chain while the manager already holds it mutably borrowed is not
    /// expressible without unsafe code, so a staging buffer per slot plays
    /// the same buffering role a direct receiver callback would. `Arc<Mutex<_>>`
    /// rather than `Rc<RefCell<_>>` because the closure capturing it is
    /// boxed as a `Send` `Receiver`.
    staged: Arc<Mutex<Vec<u8>>>,
}

/// Shared mutable state every handler's `Writer` closure closes over:
/// connection/buffering state plus the caller-supplied transport sink.
///
/// `pub(crate)` so the MPI handler's editor worker threads (spawned in
/// `crate::mpi`) can hold their own `Arc<Mutex<ManagerShared>>` and write
/// through the same serialization point as the main-context handlers.
pub(crate) struct ManagerShared {
    is_connected: bool,
    write_buffer: Vec<u8>,
    transport_writer: Box<dyn FnMut(&[u8]) + Send>,
}

impl ManagerShared {
    pub(crate) fn write_raw(&mut self, data: &[u8]) {
        if self.is_connected {
            (self.transport_writer)(data);
        } else {
            self.write_buffer.extend_from_slice(data);
        }
    }

    /// Builds an already-connected `ManagerShared` directly against
    /// `transport_writer`, skipping `Manager` entirely. Used by `crate::mpi`'s
    /// tests, which need a writer handle but not a whole chain.
    #[cfg(test)]
    pub(crate) fn for_test(transport_writer: Box<dyn FnMut(&[u8]) + Send>) -> Self {
        Self { is_connected: true, write_buffer: Vec::new(), transport_writer }
    }
}

/// Canonicalizes a caller-supplied line ending sequence for `prompt_terminator`:
/// `CRLF -> LF`, `CR NUL -> CR`, then
/// `CR -> CR NUL`, `LF -> CR LF`.
fn canonicalize_terminator(value: &[u8]) -> Vec<u8> {
    let mut normalized = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        match value[i] {
            CR if value.get(i + 1) == Some(&LF) => {
                normalized.push(LF);
                i += 2;
            }
            CR if value.get(i + 1) == Some(&NUL) => {
                normalized.push(CR);
                i += 2;
            }
            other => {
                normalized.push(other);
                i += 1;
            }
        }
    }
    let mut wire = Vec::with_capacity(normalized.len() * 2);
    for &byte in &normalized {
        match byte {
            CR => wire.extend_from_slice(&[CR, NUL]),
            LF => wire.extend_from_slice(&[CR, LF]),
            other => wire.push(other),
        }
    }
    wire
}

/// Composes the handler chain, owns pre-connection buffering in both
/// directions, and is the single `Writer` every handler in the chain is
/// constructed against.
pub struct Manager {
    shared: Arc<Mutex<ManagerShared>>,
    chain: Vec<ChainEntry>,
    read_buffer: Vec<u8>,
    terminal_receiver: Receiver,
    is_client: bool,
    prompt_terminator: Vec<u8>,
    pending_mccp: Option<Arc<Mutex<McpState>>>,
}

impl Manager {
    /// Builds a manager wired to `transport_writer` (pushes bytes to the
    /// peer) and `application_receiver` (receives fully decoded application
    /// bytes). `prompt_terminator` overrides the default `IAC GA`.
    pub fn new(
        is_client: bool,
        transport_writer: Box<dyn FnMut(&[u8]) + Send>,
        application_receiver: Receiver,
        prompt_terminator: Option<&[u8]>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(ManagerShared {
            is_connected: false,
            write_buffer: Vec::new(),
            transport_writer,
        }));
        let prompt_terminator = match prompt_terminator {
            Some(value) => canonicalize_terminator(value),
            None => vec![IAC, GA],
        };
        Self {
            shared,
            chain: Vec::new(),
            read_buffer: Vec::new(),
            terminal_receiver: application_receiver,
            is_client,
            prompt_terminator,
            pending_mccp: None,
        }
    }

    /// True once `connect` has been called (and `disconnect` has not since).
    pub fn is_connected(&self) -> bool {
        self.shared.lock().expect("manager mutex poisoned").is_connected
    }

    /// True if this side of the connection is the client.
    pub fn is_client(&self) -> bool {
        self.is_client
    }

    fn writer_handle(&self) -> Writer {
        let shared = Arc::clone(&self.shared);
        Box::new(move |data: &[u8]| {
            shared.lock().expect("manager mutex poisoned").write_raw(data);
        })
    }

    /// A writer handle suitable for handing to a worker thread (MPI editor
    /// sessions): serializes through the same mutex every in-chain handler
    /// writes through.
    pub(crate) fn threadsafe_writer_handle(&self) -> Arc<Mutex<ManagerShared>> {
        Arc::clone(&self.shared)
    }

    fn has_kind(&self, kind: HandlerKind) -> bool {
        self.chain.iter().any(|entry| entry.kind == kind)
    }

    /// Constructs and appends one handler to the end of the chain, wiring
    /// its `writer` to `Manager::write` and its `receiver` to whatever is
    /// currently the terminal of the chain. Fails if a handler of the same
    /// kind is already registered.
    pub fn register(&mut self, spec: HandlerSpec) -> Result<()> {
        let kind = match &spec {
            HandlerSpec::Telnet { .. } => HandlerKind::Telnet,
            HandlerSpec::Mccp => HandlerKind::Mccp,
            HandlerSpec::Mpi { .. } => HandlerKind::Mpi,
            HandlerSpec::Xml { .. } => HandlerKind::Xml,
        };
        if self.has_kind(kind) {
            return Err(ManagerError::AlreadyRegistered(kind.name()));
        }

        let staged = Arc::new(Mutex::new(Vec::new()));
        let receiver: Receiver = {
            let staged = Arc::clone(&staged);
            Box::new(move |data: &[u8]| staged.lock().expect("staging buffer mutex poisoned").extend_from_slice(data))
        };
        let writer = self.writer_handle();
        let is_client = self.is_client;

        let handler: Box<dyn ConnectionInterface> = match spec {
            HandlerSpec::Telnet { charset, naws, gmcp } => {
                let mut telnet = TelnetHandler::new(is_client, writer, receiver);
                if let Some(mccp_state) = self.pending_mccp.take() {
                    telnet.add_delegate(Box::new(MccpDelegate::new(mccp_state)));
                }
                if charset {
                    telnet.add_delegate(Box::new(CharsetDelegate::new(is_client)));
                }
                if naws {
                    telnet.add_delegate(Box::new(NawsDelegate::new(is_client)));
                }
                if let Some(client_info) = gmcp {
                    telnet.add_delegate(Box::new(GmcpDelegate::new(is_client, client_info)));
                }
                Box::new(telnet)
            }
            HandlerSpec::Mccp => {
                let state = Arc::new(Mutex::new(McpState::default()));
                self.pending_mccp = Some(Arc::clone(&state));
                Box::new(MccpHandler::new(is_client, writer, receiver, state))
            }
            HandlerSpec::Mpi { output_format, launcher } => {
                let launcher = match launcher {
                    Some(launcher) => launcher,
                    None => {
                        let launcher = ProcessEditorLauncher::try_new().map_err(|(kind, checked)| ManagerError::NoEditorAvailable(kind, checked))?;
                        Arc::new(launcher)
                    }
                };
                Box::new(MpiHandler::new(is_client, writer, receiver, output_format, launcher, self.threadsafe_writer_handle()))
            }
            HandlerSpec::Xml { output_format } => Box::new(XmlHandler::new(is_client, writer, receiver, output_format)),
        };

        let mut handler = handler;
        if self.is_connected() {
            handler.on_connection_made();
        }
        self.chain.push(ChainEntry { kind, handler, staged });
        Ok(())
    }

    /// Removes the handler of `kind`, rewiring the previous handler (if any)
    /// to forward straight to the next, and calling `on_connection_lost` on
    /// the removed handler. Fails if no such handler is registered.
    pub fn unregister(&mut self, kind: HandlerKind) -> Result<()> {
        let index = self.chain.iter().position(|entry| entry.kind == kind).ok_or(ManagerError::NotRegistered(kind.name()))?;
        let mut removed = self.chain.remove(index);
        removed.handler.on_connection_lost();
        Ok(())
    }

    /// Feeds bytes received from the transport into the chain. Buffers if
    /// not yet connected or the chain is empty.
    pub fn parse(&mut self, data: &[u8]) {
        if !self.is_connected() || self.chain.is_empty() {
            self.read_buffer.extend_from_slice(data);
            return;
        }
        let mut pending = if self.read_buffer.is_empty() {
            data.to_vec()
        } else {
            let mut buffered = std::mem::take(&mut self.read_buffer);
            buffered.extend_from_slice(data);
            buffered
        };
        if pending.is_empty() {
            return;
        }
        for entry in self.chain.iter_mut() {
            entry.staged.lock().expect("staging buffer mutex poisoned").clear();
            entry.handler.on_data_received(&pending);
            pending = std::mem::take(&mut *entry.staged.lock().expect("staging buffer mutex poisoned"));
            if pending.is_empty() {
                return;
            }
        }
        (self.terminal_receiver)(&pending);
    }

    /// Writes bytes from the application or a handler toward the peer.
    /// `escape` applies IAC doubling and CR/LF canonicalization for the
    /// wire; `prompt` appends the configured `prompt_terminator`.
    pub fn write(&mut self, data: &[u8], escape: bool, prompt: bool) {
        let mut out = if escape { escape_for_wire(data) } else { data.to_vec() };
        if prompt {
            out.extend_from_slice(&self.prompt_terminator);
        }
        if !self.is_connected() {
            self.shared.lock().expect("manager mutex poisoned").write_buffer.extend_from_slice(&out);
            return;
        }
        self.shared.lock().expect("manager mutex poisoned").write_raw(&out);
    }

    /// Flips `is_connected`, replays any buffered reads through `parse` and
    /// any buffered writes out to the transport. Idempotent.
    pub fn connect(&mut self) {
        if self.is_connected() {
            return;
        }
        {
            let mut shared = self.shared.lock().expect("manager mutex poisoned");
            shared.is_connected = true;
        }
        for entry in self.chain.iter_mut() {
            entry.handler.on_connection_made();
        }
        let buffered_reads = std::mem::take(&mut self.read_buffer);
        if !buffered_reads.is_empty() {
            self.parse(&buffered_reads);
        }
        let buffered_writes = {
            let mut shared = self.shared.lock().expect("manager mutex poisoned");
            std::mem::take(&mut shared.write_buffer)
        };
        if !buffered_writes.is_empty() {
            self.shared.lock().expect("manager mutex poisoned").write_raw(&buffered_writes);
        }
    }

    /// Unregisters every handler in chain order, calling `on_connection_lost`
    /// on each, then flips `is_connected`. Idempotent.
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        while let Some(mut entry) = self.chain.pop() {
            entry.handler.on_connection_lost();
        }
        self.shared.lock().expect("manager mutex poisoned").is_connected = false;
    }
}

/// IAC doubling plus the outbound CR/LF canonicalization `Manager::write`
/// applies when `escape` is set: bare `CR -> CR NUL`,
/// bare `LF -> CR LF`.
fn escape_for_wire(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            IAC => out.extend_from_slice(&[IAC, IAC]),
            CR => out.extend_from_slice(&[CR, NUL]),
            LF => out.extend_from_slice(&[CR, LF]),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc as StdArc, Mutex as StdMutex};

    fn sinks() -> (Box<dyn FnMut(&[u8]) + Send>, Receiver, StdArc<StdMutex<Vec<u8>>>, StdArc<StdMutex<Vec<u8>>>) {
        let sent = StdArc::new(StdMutex::new(Vec::new()));
        let received = StdArc::new(StdMutex::new(Vec::new()));
        let sent_clone = StdArc::clone(&sent);
        let received_clone = StdArc::clone(&received);
        let writer: Box<dyn FnMut(&[u8]) + Send> = Box::new(move |data: &[u8]| sent_clone.lock().unwrap().extend_from_slice(data));
        let receiver: Receiver = Box::new(move |data: &[u8]| received_clone.lock().unwrap().extend_from_slice(data));
        (writer, receiver, sent, received)
    }

    #[test]
    fn parse_buffers_before_connect_and_replays_on_connect() {
        let (writer, receiver, _sent, received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, None);
        manager.register(HandlerSpec::Telnet { charset: false, naws: false, gmcp: None }).unwrap();
        manager.parse(b"hello");
        assert!(received.lock().unwrap().is_empty());
        manager.connect();
        assert_eq!(&*received.lock().unwrap(), b"hello");
    }

    #[test]
    fn write_buffers_before_connect_and_replays_on_connect() {
        let (writer, receiver, sent, _received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, None);
        manager.write(b"hi", false, false);
        assert!(sent.lock().unwrap().is_empty());
        manager.connect();
        assert_eq!(&*sent.lock().unwrap(), b"hi");
    }

    #[test]
    fn write_with_prompt_appends_default_terminator() {
        let (writer, receiver, sent, _received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, None);
        manager.connect();
        manager.write(b"> ", false, true);
        assert_eq!(&*sent.lock().unwrap(), &[b'>', b' ', IAC, GA]);
    }

    #[test]
    fn write_with_escape_doubles_iac_and_canonicalizes_newlines() {
        let (writer, receiver, sent, _received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, None);
        manager.connect();
        manager.write(&[b'a', IAC, CR, LF], true, false);
        assert_eq!(&*sent.lock().unwrap(), &[b'a', IAC, IAC, CR, NUL, CR, LF]);
    }

    #[test]
    fn register_rejects_duplicate_kind() {
        let (writer, receiver, _sent, _received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, None);
        manager.register(HandlerSpec::Telnet { charset: false, naws: false, gmcp: None }).unwrap();
        let err = manager.register(HandlerSpec::Telnet { charset: false, naws: false, gmcp: None }).unwrap_err();
        assert!(matches!(err, ManagerError::AlreadyRegistered("Telnet")));
    }

    #[test]
    fn unregister_missing_kind_errors() {
        let (writer, receiver, _sent, _received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, None);
        let err = manager.unregister(HandlerKind::Xml).unwrap_err();
        assert!(matches!(err, ManagerError::NotRegistered("Xml")));
    }

    #[test]
    fn custom_prompt_terminator_is_canonicalized() {
        let (writer, receiver, sent, _received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, Some(b"\n"));
        manager.connect();
        manager.write(b"", false, true);
        assert_eq!(&*sent.lock().unwrap(), &[CR, LF]);
    }

    #[test]
    fn chain_forwards_through_telnet_to_application() {
        let (writer, receiver, _sent, received) = sinks();
        let mut manager = Manager::new(true, writer, receiver, None);
        manager.register(HandlerSpec::Telnet { charset: false, naws: false, gmcp: None }).unwrap();
        manager.connect();
        manager.parse(b"hello world");
        assert_eq!(&*received.lock().unwrap(), b"hello world");
    }
}
