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

//! Byte-level utilities shared across the protocol stack: IAC escaping and
//! XML entity escape/unescape. All protocol layers are byte-oriented; these
//! are the only places a transformation consults character semantics, and
//! even then only ASCII-range named entities plus numeric references.

use crate::constants::IAC;

/// Doubles every `IAC` (0xFF) byte in `data`, as required before writing a
/// subnegotiation payload to the wire.
pub fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}

/// Escapes `&`, `<`, and `>` in a string for inclusion in XML-flavored text.
/// `&` is escaped first so the other replacements cannot double-escape it.
pub fn escape_xml_string(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Unescapes numeric (`&#NN;`, `&#xHH;`) and named (`&amp;`, `&lt;`, `&gt;`)
/// XML entities in a byte slice. Malformed numeric references are left
/// untouched rather than causing an error, matching the forgiving behavior
/// expected of a MUME client talking to a single known server.
pub fn unescape_xml_bytes(data: &[u8]) -> Vec<u8> {
    let numeric = unescape_numeric_entities(data);
    let mut out = numeric;
    out = replace_bytes(&out, b"&lt;", b"<");
    out = replace_bytes(&out, b"&gt;", b">");
    out = replace_bytes(&out, b"&amp;", b"&");
    out
}

fn unescape_numeric_entities(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'&' && data.get(i + 1) == Some(&b'#') {
            let is_hex = data.get(i + 2) == Some(&b'x') || data.get(i + 2) == Some(&b'X');
            let digits_start = i + if is_hex { 3 } else { 2 };
            let mut j = digits_start;
            while j < data.len() && data[j] != b';' {
                j += 1;
            }
            if j < data.len() && j > digits_start {
                let digits = std::str::from_utf8(&data[digits_start..j]).ok();
                let value = digits.and_then(|d| {
                    if is_hex {
                        u32::from_str_radix(d, 16).ok()
                    } else {
                        d.parse::<u32>().ok()
                    }
                });
                if let Some(value) = value
                    && let Ok(byte) = u8::try_from(value)
                {
                    out.push(byte);
                    i = j + 1;
                    continue;
                }
            }
        }
        out.push(data[i]);
        i += 1;
    }
    out
}

fn replace_bytes(data: &[u8], pattern: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i..].starts_with(pattern) {
            out.extend_from_slice(replacement);
            i += pattern.len();
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

/// Decodes bytes to a string, preferring US-ASCII, falling back to UTF-8,
/// and finally treating the data as Latin-1 with `?` substituted for any
/// byte that still fails to map. This never fails: display code always gets
/// a `String` back.
pub fn decode_bytes(data: &[u8]) -> String {
    if data.is_ascii() {
        // Safety net: ASCII is always valid UTF-8.
        return String::from_utf8_lossy(data).into_owned();
    }
    if let Ok(s) = std::str::from_utf8(data) {
        return s.to_owned();
    }
    data.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_iac_doubles_every_occurrence() {
        assert_eq!(escape_iac(&[0x41, 0xFF, 0x42, 0xFF, 0xFF]), vec![0x41, 0xFF, 0xFF, 0x42, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn escape_iac_on_empty_is_empty() {
        assert_eq!(escape_iac(&[]), Vec::<u8>::new());
    }

    #[test]
    fn escape_xml_string_orders_ampersand_first() {
        assert_eq!(escape_xml_string("<a & b>"), "&lt;a &amp; b&gt;");
    }

    #[test]
    fn unescape_xml_bytes_handles_named_entities() {
        assert_eq!(unescape_xml_bytes(b"&lt;a &amp; b&gt;"), b"<a & b>");
    }

    #[test]
    fn unescape_xml_bytes_handles_numeric_entities() {
        assert_eq!(unescape_xml_bytes(b"&#65;&#x42;"), b"AB");
    }

    #[test]
    fn unescape_xml_bytes_leaves_malformed_numeric_reference_untouched() {
        assert_eq!(unescape_xml_bytes(b"&#;"), b"&#;");
    }

    #[test]
    fn decode_bytes_prefers_ascii() {
        assert_eq!(decode_bytes(b"hello"), "hello");
    }

    #[test]
    fn decode_bytes_falls_back_to_latin1() {
        // 0xE9 is Latin-1 'e' with acute accent, not valid UTF-8 on its own.
        assert_eq!(decode_bytes(&[0x68, 0xE9]), "h\u{e9}");
    }
}
