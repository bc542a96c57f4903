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

//! # mudproto-telnet
//!
//! The Telnet (RFC 854) framing and option-negotiation core shared by MUD
//! clients and servers: IAC escaping, CRLF/CR-NUL canonicalization, Q-method
//! (RFC 1143) WILL/WONT/DO/DONT negotiation, and subnegotiation framing.
//!
//! This crate has no notion of sockets. It is driven by whatever owns the
//! transport, which feeds it bytes through [`connection::ConnectionInterface::on_data_received`]
//! and receives bytes to send through a [`connection::Writer`] closure
//! supplied at construction.
//!
//! Higher-level option policy (NAWS, Charset, GMCP, MCCP) and MUME-specific
//! framing (MPI, XML tags) live one layer up, in the `mudproto` crate, as
//! [`telnet::TelnetDelegate`] implementations or standalone
//! [`connection::ConnectionInterface`] handlers.

pub mod bytes;
pub mod connection;
pub mod constants;
pub mod error;
pub mod option;
pub mod telnet;

pub use connection::{ConnectionInterface, Receiver, Writer};
pub use error::TelnetCodecError;
pub use option::{OptionPerspective, OptionState, OptionTable};
pub use telnet::{TelnetCore, TelnetDelegate, TelnetHandler, TelnetState};
