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

//! Error types for the Telnet core.

use thiserror::Error;

/// Errors the Telnet core can surface to its owner.
///
/// Most anomalies (framing, negotiation misuse) are logged and recovered
/// locally rather than surfaced here. Only unrecoverable invariant
/// violations and post-agreement policy refusals ever reach the caller as
/// a `TelnetCodecError`.
#[derive(Debug, Error)]
pub enum TelnetCodecError {
    /// A negotiation reached a state the Q-method truth table says is
    /// unreachable (both `enabled` and `negotiating` set for one
    /// perspective). This is a fatal internal error, not a protocol anomaly.
    #[error("invariant violation: option {option:#04x} is both enabled and negotiating for {perspective}")]
    InvariantViolation {
        /// The option byte in the offending state.
        option: u8,
        /// Which perspective (`"us"` or `"him"`) violated the invariant.
        perspective: &'static str,
    },

    /// A policy callback (`on_enable_remote`, etc.) rejected an enable that
    /// the Q-method had already committed the peer to (the peer agreed to
    /// our request, but our own policy now says no). This indicates a bug
    /// in the policy callback, not a protocol anomaly.
    #[error("policy refused option {option:#04x} after peer agreed to enable it")]
    PolicyRefusedAfterAgreement {
        /// The option byte in question.
        option: u8,
    },
}
