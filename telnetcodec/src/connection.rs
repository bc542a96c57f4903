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

//! The `ConnectionInterface` contract: every handler in a chain, whether it
//! is the Telnet core or a standalone protocol such as MPI or XML, writes
//! toward the peer through a `Writer` closure and hands decoded application
//! bytes to the next handler through a `Receiver` closure.

/// Pushes bytes toward the peer. Bound to `Manager::write` for every handler
/// in a chain.
pub type Writer = Box<dyn FnMut(&[u8]) + Send>;
/// Hands fully decoded application bytes to the next handler (or the
/// terminal application callback).
pub type Receiver = Box<dyn FnMut(&[u8]) + Send>;

/// Input and output to a MUD client or server.
///
/// A handler owns a `Writer` pointed at the layer below it (ultimately the
/// transport) and a `Receiver` pointed at the layer above it (ultimately the
/// application). Implementations strip the bytes they understand out of
/// `on_data_received` and forward whatever remains to `self.receiver`.
pub trait ConnectionInterface: Send {
    /// True if acting as a client, false if acting as a server.
    fn is_client(&self) -> bool;

    /// True if acting as a server, false otherwise.
    fn is_server(&self) -> bool {
        !self.is_client()
    }

    /// Writes data to the peer via the wired writer callback.
    fn write(&mut self, data: &[u8]);

    /// Called by the owning `Manager` when a connection to peer has been established.
    fn on_connection_made(&mut self) {}

    /// Called by the owning `Manager` when a connection to peer has been lost.
    fn on_connection_lost(&mut self) {}

    /// Called when data is received from the layer below. Implementations
    /// forward bytes they do not consume to the wired receiver callback.
    fn on_data_received(&mut self, data: &[u8]);
}
