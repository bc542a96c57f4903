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

//! # mudproto
//!
//! The handler-chain [`manager::Manager`] that composes `mudproto-telnet`'s
//! Telnet core with the MUME/MUD protocol mix-ins: Charset, NAWS, and GMCP
//! ride along as [`mudproto_telnet::telnet::TelnetDelegate`]s attached to
//! the Telnet handler; MCCP splices zlib decompression in below Telnet;
//! MPI and XML are standalone framing layers above it.
//!
//! A caller builds a [`manager::Manager`], registers the handlers it wants
//! via [`manager::HandlerSpec`] in bottom-up chain order, then drives it
//! with `connect`/`parse`/`write`/`disconnect`.

pub mod charset;
pub mod error;
pub mod gmcp;
pub mod manager;
pub mod mccp;
pub mod mpi;
pub mod naws;
pub mod xml;

pub use error::{ManagerError, Result};
pub use manager::{HandlerKind, HandlerSpec, Manager};
