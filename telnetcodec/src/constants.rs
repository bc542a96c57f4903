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

//! Byte constants for Telnet (RFC 854 and friends) and MUD-specific options.
//!
//! See <https://www.iana.org/assignments/telnet-options> for the full option
//! registry this catalog samples from.

/// ASCII NUL.
pub const NUL: u8 = 0;
/// ASCII BEL.
pub const BEL: u8 = 7;
/// ASCII LF.
pub const LF: u8 = 10;
/// ASCII CR.
pub const CR: u8 = 13;

/// Interpret As Command.
pub const IAC: u8 = 255;
/// End of subnegotiation parameters.
pub const SE: u8 = 240;
/// No operation.
pub const NOP: u8 = 241;
/// Data Mark.
pub const DM: u8 = 242;
/// NVT character Break.
pub const BRK: u8 = 243;
/// Interrupt Process.
pub const IP: u8 = 244;
/// Abort Output.
pub const AO: u8 = 245;
/// Are You There.
pub const AYT: u8 = 246;
/// Erase Character.
pub const EC: u8 = 247;
/// Erase Line.
pub const EL: u8 = 248;
/// Go Ahead.
pub const GA: u8 = 249;
/// Begin subnegotiation of the indicated option.
pub const SB: u8 = 250;
/// End Of File (RFC 1184).
pub const XEOF: u8 = 236;
/// Suspend Process (RFC 1184).
pub const SUSP: u8 = 237;
/// Abort Process (RFC 1184).
pub const ABORT: u8 = 238;
/// End Of Record (RFC 885).
pub const EOR: u8 = 239;
/// Desire to begin performing, or confirmation of performing, an option.
pub const WILL: u8 = 251;
/// Refusal to perform, or continue performing, an option.
pub const WONT: u8 = 252;
/// Request that the peer perform, or confirmation it is expected to, an option.
pub const DO: u8 = 253;
/// Demand that the peer stop performing, or confirmation it is no longer expected to, an option.
pub const DONT: u8 = 254;

/// Commands that take no option byte and are dispatched as a bare `on_command`.
pub const COMMAND_BYTES: [u8; 13] = [XEOF, SUSP, ABORT, EOR, NOP, DM, BRK, IP, AO, AYT, EC, EL, GA];
/// Commands that introduce a Q-method negotiation and expect an option byte next.
pub const NEGOTIATION_BYTES: [u8; 4] = [WILL, WONT, DO, DONT];

/// Telnet option: Transmit Binary (RFC 856).
pub const TRANSMIT_BINARY: u8 = 0;
/// Telnet option: Echo (RFC 857).
pub const ECHO: u8 = 1;
/// Telnet option: Suppress Go Ahead (RFC 858).
pub const SGA: u8 = 3;
/// Telnet option: Status (RFC 859).
pub const STATUS: u8 = 5;
/// Telnet option: Terminal Type (RFC 1091).
pub const TTYPE: u8 = 24;
/// Telnet option: Negotiate About Window Size (RFC 1073).
pub const NAWS: u8 = 31;
/// Telnet option: Line Mode (RFC 1116/1184).
pub const LINEMODE: u8 = 34;
/// Telnet option: New Environment (RFC 1571/1572).
pub const NEW_ENVIRON: u8 = 39;
/// Telnet option: Charset (RFC 2066).
pub const CHARSET: u8 = 42;

/// Mud Server Data Protocol.
pub const MSDP: u8 = 69;
/// Mud Server Status Protocol.
pub const MSSP: u8 = 70;
/// Mud Client Compression Protocol v1.
pub const MCCP1: u8 = 85;
/// Mud Client Compression Protocol v2.
pub const MCCP2: u8 = 86;
/// Mud Client Compression Protocol v3.
pub const MCCP3: u8 = 87;
/// Mud Sound Protocol.
pub const MSP: u8 = 90;
/// Mud Extension Protocol.
pub const MXP: u8 = 91;
/// Zenith Mud Protocol.
pub const ZMP: u8 = 93;
/// Achaea Telnet Client Protocol.
pub const ATCP: u8 = 200;
/// Generic Mud Communication Protocol.
pub const GMCP: u8 = 201;

/// Charset subnegotiation sub-commands (RFC 2066).
pub const CHARSET_REQUEST: u8 = 1;
/// Peer accepted a requested charset.
pub const CHARSET_ACCEPTED: u8 = 2;
/// Peer rejected a requested charset.
pub const CHARSET_REJECTED: u8 = 3;

/// Human-readable name for a known option byte, for log messages. `None` for
/// unassigned/unrecognized bytes.
pub const fn describe_option(byte: u8) -> Option<&'static str> {
    match byte {
        TRANSMIT_BINARY => Some("TRANSMIT-BINARY"),
        ECHO => Some("ECHO"),
        SGA => Some("SUPPRESS-GO-AHEAD"),
        STATUS => Some("STATUS"),
        TTYPE => Some("TERMINAL-TYPE"),
        NAWS => Some("NAWS"),
        LINEMODE => Some("LINEMODE"),
        NEW_ENVIRON => Some("NEW-ENVIRON"),
        CHARSET => Some("CHARSET"),
        MSDP => Some("MSDP"),
        MSSP => Some("MSSP"),
        MCCP1 => Some("MCCP1"),
        MCCP2 => Some("MCCP2"),
        MCCP3 => Some("MCCP3"),
        MSP => Some("MSP"),
        MXP => Some("MXP"),
        ZMP => Some("ZMP"),
        ATCP => Some("ATCP"),
        GMCP => Some("GMCP"),
        _ => None,
    }
}
