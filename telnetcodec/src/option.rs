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

//! Per-option negotiation state: `OptionPerspective`, `OptionState`, and the
//! 256-entry `OptionTable` that replaces a hash map lookup with direct array
//! indexing by option byte.

/// One side's view of a single Telnet option.
///
/// Invariant: `enabled && negotiating` is unreachable. Any code path that
/// would produce it is a fatal internal error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptionPerspective {
    /// Whether the option is currently active for this side.
    pub enabled: bool,
    /// Whether a WILL/WONT/DO/DONT for this option is in flight.
    pub negotiating: bool,
}

impl OptionPerspective {
    /// True if both `enabled` and `negotiating` are set, the one state this
    /// perspective may never reach.
    pub fn is_invariant_violated(&self) -> bool {
        self.enabled && self.negotiating
    }
}

/// The negotiation state of a single option from both sides: what *we* do
/// (`us`), and what *the peer* does (`him`).
#[derive(Clone, Copy, Debug, Default)]
pub struct OptionState {
    /// Our own perspective: do we perform this option.
    pub us: OptionPerspective,
    /// The peer's perspective: does the peer perform this option.
    pub him: OptionPerspective,
}

/// Lazily-populated per-option negotiation state, indexed directly by option
/// byte instead of hashed.
pub struct OptionTable {
    entries: [Option<OptionState>; 256],
}

impl OptionTable {
    /// Creates an empty table; every option starts unreferenced.
    pub fn new() -> Self {
        Self { entries: [None; 256] }
    }

    /// Returns the state for `option`, creating a default (all-false) entry
    /// on first reference.
    pub fn get_or_init(&mut self, option: u8) -> &mut OptionState {
        self.entries[option as usize].get_or_insert_with(OptionState::default)
    }

    /// Returns the state for `option` if it has ever been referenced,
    /// without creating one.
    pub fn get(&self, option: u8) -> Option<&OptionState> {
        self.entries[option as usize].as_ref()
    }
}

impl Default for OptionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for OptionTable {
    fn clone(&self) -> Self {
        Self { entries: self.entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreferenced_option_has_no_state() {
        let table = OptionTable::new();
        assert!(table.get(31).is_none());
    }

    #[test]
    fn get_or_init_creates_default_state() {
        let mut table = OptionTable::new();
        let state = table.get_or_init(31);
        assert!(!state.us.enabled);
        assert!(!state.him.enabled);
        assert!(table.get(31).is_some());
    }

    #[test]
    fn invariant_violation_detection() {
        let p = OptionPerspective { enabled: true, negotiating: true };
        assert!(p.is_invariant_violated());
        let p = OptionPerspective { enabled: true, negotiating: false };
        assert!(!p.is_invariant_violated());
    }
}
