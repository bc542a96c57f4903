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

//! The MUME XML tokenizer and mode state machine: reads a
//! MUME-flavored XML-tagged byte stream, emits high-level room/prompt/
//! movement events, and produces a clean text stream in one of three
//! `output_format`s (`raw`, `normal`, `tintin`).

use mudproto_telnet::bytes::unescape_xml_bytes;
use mudproto_telnet::connection::{ConnectionInterface, Receiver, Writer};

const MPI_INIT: &[u8] = b"~$#E";
const TINTIN_TAGS: [&[u8]; 7] = [b"prompt", b"name", b"tell", b"narrate", b"pray", b"say", b"emote"];

/// How recognized tags are rendered into the outgoing text stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XmlOutputFormat {
    /// Pass everything through unchanged, tags included.
    Raw,
    /// Drop all tags.
    Normal,
    /// Replace a fixed set of tags with `TAG:`/`:TAG` markers, drop the rest.
    Tintin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum XmlState {
    Data,
    Tag,
}

/// Which XML tag is currently open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XmlMode {
    /// Not inside any recognized tag.
    None,
    Description,
    Exits,
    Magic,
    Name,
    Prompt,
    Room,
    Terrain,
}

fn xml_mode_for_tag(name: &str) -> Option<XmlMode> {
    match name {
        "description" => Some(XmlMode::Description),
        "exits" => Some(XmlMode::Exits),
        "magic" => Some(XmlMode::Magic),
        "name" => Some(XmlMode::Name),
        "prompt" => Some(XmlMode::Prompt),
        "room" => Some(XmlMode::Room),
        "terrain" => Some(XmlMode::Terrain),
        _ => None,
    }
}

fn event_name_for_mode(mode: XmlMode) -> &'static str {
    match mode {
        XmlMode::None => "none",
        XmlMode::Description => "description",
        XmlMode::Exits => "exits",
        XmlMode::Magic => "magic",
        XmlMode::Name => "name",
        XmlMode::Prompt => "prompt",
        XmlMode::Room => "dynamic",
        XmlMode::Terrain => "terrain",
    }
}

/// Extracts `dir="north"` (or unquoted/single-quoted) from a self-closing
/// `movement` tag's raw bytes.
fn direction_from_movement(tag: &[u8]) -> Vec<u8> {
    const DIRECTIONS: [&[u8]; 6] = [b"north", b"east", b"south", b"west", b"up", b"down"];
    let Some(pos) = find_subslice(tag, b"dir=") else {
        return Vec::new();
    };
    let mut rest = &tag[pos + 4..];
    if let Some(&quote) = rest.first()
        && (quote == b'\'' || quote == b'"')
    {
        rest = &rest[1..];
    }
    for direction in DIRECTIONS {
        if rest.starts_with(direction) {
            return direction.to_vec();
        }
    }
    Vec::new()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn tintin_replacement(tag: &[u8]) -> Vec<u8> {
    let is_closing = tag.starts_with(b"/");
    let name = if is_closing { &tag[1..] } else { tag };
    if !TINTIN_TAGS.iter().any(|&t| t == name) {
        return Vec::new();
    }
    let upper: Vec<u8> = name.to_ascii_uppercase();
    if is_closing {
        let mut out = vec![b':'];
        out.extend(upper);
        out
    } else {
        let mut out = upper;
        out.push(b':');
        out
    }
}

/// One semantic event produced by the tokenizer: a tag name (or `"line"`
/// for plain text outside any tag) and its payload, with XML entities
/// already resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlEvent {
    /// `"line"`, `"room"`, `"name"`, `"description"`, `"exits"`,
    /// `"terrain"`, `"dynamic"`, `"magic"`, `"prompt"`, or `"movement"`.
    pub name: &'static str,
    /// Entity-unescaped payload bytes.
    pub data: Vec<u8>,
}

/// Tokenizes MUME's inline XML dialect, emitting [`XmlEvent`]s through a
/// caller-supplied callback while forwarding a clean text stream downstream.
pub struct XmlHandler {
    is_client: bool,
    writer: Writer,
    receiver: Receiver,
    output_format: XmlOutputFormat,
    state: XmlState,
    tag_buffer: Vec<u8>,
    text_buffer: Vec<u8>,
    dynamic_buffer: Vec<u8>,
    line_buffer: Vec<u8>,
    gratuitous: bool,
    mode: XmlMode,
    parent_modes: Vec<XmlMode>,
    events: Vec<XmlEvent>,
}

impl XmlHandler {
    pub(crate) fn new(is_client: bool, writer: Writer, receiver: Receiver, output_format: XmlOutputFormat) -> Self {
        Self {
            is_client,
            writer,
            receiver,
            output_format,
            state: XmlState::Data,
            tag_buffer: Vec::new(),
            text_buffer: Vec::new(),
            dynamic_buffer: Vec::new(),
            line_buffer: Vec::new(),
            gratuitous: false,
            mode: XmlMode::None,
            parent_modes: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Drains and returns every [`XmlEvent`] emitted since the last call.
    /// Callers (or tests) poll this after each `on_data_received`; a
    /// production caller would instead wire a callback; only the ordering
    /// of events matters, not how they reach the application.
    pub fn take_events(&mut self) -> Vec<XmlEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, name: &'static str, data: Vec<u8>) {
        self.events.push(XmlEvent { name, data });
    }

    /// Handles XML text outside a tag: partitions at
    /// `<`, routes the prefix by current mode, and handles the `NONE`-mode
    /// line-splitting into `line` events.
    fn handle_text(&mut self, data: &[u8], app_data_buffer: &mut Vec<u8>) -> usize {
        let lt_pos = data.iter().position(|&b| b == b'<');
        let found_lt = lt_pos.is_some();
        let (prefix, consumed_through_lt) = match lt_pos {
            Some(pos) => (&data[..pos], pos + 1),
            None => (data, data.len()),
        };

        if self.output_format == XmlOutputFormat::Raw || !self.gratuitous {
            app_data_buffer.extend_from_slice(prefix);
        }

        match self.mode {
            XmlMode::None => {
                self.line_buffer.extend_from_slice(prefix);
                self.split_buffered_lines();
            }
            XmlMode::Room => self.dynamic_buffer.extend_from_slice(prefix),
            _ => self.text_buffer.extend_from_slice(prefix),
        }

        if found_lt {
            self.state = XmlState::Tag;
        }
        consumed_through_lt
    }

    /// Splits `self.line_buffer` into complete lines, emitting a `line`
    /// event per non-blank trimmed line and leaving any trailing partial
    /// line (one with no CR/LF terminator yet) buffered for later. More
    /// text in `NONE` mode may arrive after an intervening tag, since the
    /// line buffer is mode-scoped, not chunk-scoped.
    fn split_buffered_lines(&mut self) {
        let buffer = std::mem::take(&mut self.line_buffer);
        let mut lines: Vec<Vec<u8>> = Vec::new();
        let mut start = 0;
        let mut i = 0;
        while i < buffer.len() {
            if buffer[i] == b'\n' {
                lines.push(buffer[start..=i].to_vec());
                start = i + 1;
            } else if buffer[i] == b'\r' && buffer.get(i + 1) != Some(&b'\n') {
                lines.push(buffer[start..=i].to_vec());
                start = i + 1;
            }
            i += 1;
        }
        if start < buffer.len() {
            lines.push(buffer[start..].to_vec());
        }
        if let Some(last) = lines.last()
            && !last.ends_with(b"\r")
            && !last.ends_with(b"\n")
        {
            self.line_buffer = lines.pop().expect("checked non-empty above");
        }
        for line in lines {
            let trimmed = trim_ascii(&line);
            if !trimmed.is_empty() {
                let unescaped = unescape_xml_bytes(trim_crlf(&line));
                self.emit("line", unescaped);
            }
        }
    }

    /// Handles an open tag: partitions at `>`, interprets the tag name,
    /// and performs the mode-stack transitions.
    fn handle_tag(&mut self, data: &[u8], app_data_buffer: &mut Vec<u8>) -> usize {
        let Some(gt_pos) = data.iter().position(|&b| b == b'>') else {
            self.tag_buffer.extend_from_slice(data);
            return data.len();
        };
        self.tag_buffer.extend_from_slice(&data[..gt_pos]);
        let tag = trim_ascii(&self.tag_buffer).to_vec();
        self.tag_buffer.clear();

        let is_closing = tag.first() == Some(&b'/');
        let name_bytes: &[u8] = if is_closing { &tag[1..] } else { &tag };
        let name_bytes = name_bytes.split(|&b| b == b' ' || b == b'\t').next().unwrap_or(&[]);
        let tag_name = String::from_utf8_lossy(name_bytes).to_ascii_lowercase();

        match self.output_format {
            XmlOutputFormat::Raw => {
                app_data_buffer.push(b'<');
                app_data_buffer.extend_from_slice(&tag);
                app_data_buffer.push(b'>');
            }
            XmlOutputFormat::Tintin if !self.gratuitous => {
                app_data_buffer.extend(tintin_replacement(&tag));
            }
            _ => {}
        }

        if tag_name == "gratuitous" {
            self.gratuitous = !is_closing;
        } else if is_closing && xml_mode_for_tag(&tag_name) == Some(self.mode) {
            if self.mode == XmlMode::Room {
                let dynamic = std::mem::take(&mut self.dynamic_buffer);
                let trimmed = trim_leading_crlf(&dynamic);
                let unescaped = unescape_xml_bytes(trimmed);
                self.emit("dynamic", unescaped);
            } else {
                let text = std::mem::take(&mut self.text_buffer);
                let unescaped = unescape_xml_bytes(&text);
                self.emit(event_name_for_mode(self.mode), unescaped);
            }
            self.mode = self.parent_modes.pop().unwrap_or(XmlMode::None);
        } else if tag_name == "magic" {
            self.parent_modes.push(self.mode);
            self.mode = XmlMode::Magic;
        } else if self.mode == XmlMode::None && tag_name == "movement" {
            let direction = direction_from_movement(&unescape_xml_bytes(&tag));
            self.emit("movement", direction);
        } else if self.mode == XmlMode::None {
            match tag_name.as_str() {
                "prompt" => {
                    self.parent_modes.push(self.mode);
                    self.mode = XmlMode::Prompt;
                }
                "room" => {
                    self.parent_modes.push(self.mode);
                    self.mode = XmlMode::Room;
                    let attrs = if tag.len() > 5 { &tag[5..] } else { &[] };
                    self.emit("room", unescape_xml_bytes(attrs));
                }
                _ => {}
            }
        } else if self.mode == XmlMode::Room {
            if let Some(child) = match tag_name.as_str() {
                "name" => Some(XmlMode::Name),
                "description" => Some(XmlMode::Description),
                "exits" => Some(XmlMode::Exits),
                "terrain" => Some(XmlMode::Terrain),
                _ => None,
            } {
                self.parent_modes.push(self.mode);
                self.mode = child;
            }
        }

        self.state = XmlState::Data;
        gt_pos + 1
    }
}

fn trim_ascii(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(data.len());
    let end = data.iter().rposition(|b| !b.is_ascii_whitespace()).map(|p| p + 1).unwrap_or(start);
    &data[start..end]
}

fn trim_crlf(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != b'\r' && b != b'\n').map(|p| p + 1).unwrap_or(0);
    &data[..end]
}

fn trim_leading_crlf(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&b| b != b'\r' && b != b'\n').unwrap_or(data.len());
    &data[start..]
}

impl ConnectionInterface for XmlHandler {
    fn is_client(&self) -> bool {
        self.is_client
    }

    fn write(&mut self, data: &[u8]) {
        (self.writer)(data);
    }

    fn on_connection_made(&mut self) {
        // Mode "3" enables XML output without an initial `<xml>` tag; "G"
        // wraps otherwise-suppressed room descriptions in `<gratuitous>`
        // tags.
        let mut handshake = MPI_INIT.to_vec();
        handshake.extend_from_slice(b"X2\n3G\n");
        self.write(&handshake);
    }

    fn on_data_received(&mut self, data: &[u8]) {
        let mut app_data_buffer = Vec::new();
        let mut cursor = data;
        while !cursor.is_empty() {
            let consumed = match self.state {
                XmlState::Data => self.handle_text(cursor, &mut app_data_buffer),
                XmlState::Tag => self.handle_tag(cursor, &mut app_data_buffer),
            };
            cursor = &cursor[consumed..];
        }
        if !app_data_buffer.is_empty() {
            let forwarded = if self.output_format == XmlOutputFormat::Raw {
                app_data_buffer
            } else {
                unescape_xml_bytes(&app_data_buffer)
            };
            (self.receiver)(&forwarded);
        }
    }
}
