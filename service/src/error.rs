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

//! Error types for the handler-chain manager and its mix-ins.

use mudproto_telnet::TelnetCodecError;
use thiserror::Error;

/// Result type for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Errors the manager and its handlers can surface to their owner.
///
/// Most anomalies are logged and recovered locally; only domain errors at
/// the API boundary and fatal construction/decompression failures reach the
/// caller here.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A lower-level Telnet core error propagated up.
    #[error("telnet core error: {0}")]
    Telnet(#[from] TelnetCodecError),

    /// A `register` call was given an already-constructed handler instance
    /// instead of a factory; handlers are registered by kind, not instance.
    #[error("register expects a handler factory, not a constructed instance")]
    RegisterExpectsFactory,

    /// A handler of this kind is already registered in the chain.
    #[error("handler {0} is already registered")]
    AlreadyRegistered(&'static str),

    /// `unregister` was asked to remove a handler kind not present in the
    /// chain.
    #[error("handler {0} is not registered")]
    NotRegistered(&'static str),

    /// A NAWS dimension value, or a raw NAWS payload, fell outside the
    /// 0-65535 range, or the payload was not exactly 4 bytes.
    #[error("invalid NAWS payload: {0}")]
    InvalidNaws(String),

    /// `negotiate_charset` or a `CHARSET_REQUEST` named a charset this
    /// build has no alias for.
    #[error("unknown charset: {0}")]
    UnknownCharset(String),

    /// zlib reported a decompression failure; fatal for the session.
    #[error("MCCP decompression failed: {0}")]
    Decompression(String),

    /// No resolvable editor/pager executable was found for the MPI handler
    /// at construction time; fatal construction error.
    #[error("no usable {0} executable found (checked {1:?})")]
    NoEditorAvailable(&'static str, Vec<String>),
}
