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

//! MPI (MUME's inline Remote Editing Protocol): the `\n~$#E` framing state
//! machine.
//!
//! Process spawning and temporary-file I/O for the editor/pager are
//! external collaborators, reached only through an injectable
//! [`EditorLauncher`] so the framing and threading logic stay testable
//! without spawning real processes.

use std::env;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use mudproto_telnet::connection::{ConnectionInterface, Receiver, Writer};

use crate::manager::ManagerShared;

const SENTINEL: &[u8] = b"~$#E";

/// How the MPI handler renders edit sessions: a real subprocess, or a
/// sentinel-line protocol a `tintin++`-style client script can intercept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MpiOutputFormat {
    /// Launch the real editor/pager subprocess.
    Normal,
    /// Print `MPICOMMAND:<path>:MPICOMMAND` and await an empty stdin line
    /// instead of blocking on a subprocess directly.
    Tintin,
}

/// The outcome of an edit session: the (possibly unmodified) contents and
/// whether the file's mtime changed, which decides cancel-vs-send.
pub struct EditOutcome {
    /// Final file contents after the editor exited.
    pub contents: Vec<u8>,
    /// True if the file's mtime changed across the editor invocation.
    pub changed: bool,
}

/// The process-spawning half of MPI edit/view sessions, injectable so the
/// framing state machine can be tested without touching a real editor.
pub trait EditorLauncher: Send + Sync {
    /// Writes `initial_contents` to a temp file, runs the editor on it
    /// (or prints the `tintin` sentinel line and waits), and reports
    /// whether the file changed.
    fn edit(&self, initial_contents: &[u8], output_format: MpiOutputFormat) -> std::io::Result<EditOutcome>;

    /// Writes `contents` to a temp file and runs the pager on it.
    fn view(&self, contents: &[u8], output_format: MpiOutputFormat) -> std::io::Result<()>;
}

fn resolve_executable(env_vars: &[&str], default_unix: &str, default_windows: &str) -> Option<String> {
    for var in env_vars {
        if let Ok(value) = env::var(var)
            && !value.trim().is_empty()
        {
            return Some(value);
        }
    }
    let default = if cfg!(windows) { default_windows } else { default_unix };
    which_on_path(default).map(|_| default.to_string())
}

fn which_on_path(executable: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).map(|dir| dir.join(executable)).find(|candidate| candidate.is_file())
}

/// Spawns real editor/pager subprocesses against real temp files, matching
/// `mpi.py`'s behavior: CRLF line endings in the temp file, mtime-based
/// cancel detection, Latin-1 body encoding handled by the caller.
pub struct ProcessEditorLauncher {
    editor: String,
    pager: String,
}

impl Default for ProcessEditorLauncher {
    fn default() -> Self {
        let editor = resolve_executable(&["VISUAL", "EDITOR"], "nano", "notepad.exe").unwrap_or_else(|| "nano".to_string());
        let pager = resolve_executable(&["PAGER"], "less", "notepad.exe").unwrap_or_else(|| "less".to_string());
        Self { editor, pager }
    }
}

impl ProcessEditorLauncher {
    /// Resolves `VISUAL`/`EDITOR`/`PAGER` against the host `PATH`, falling
    /// back to `nano`/`less` (`notepad.exe` on Windows). Fails if neither
    /// the editor nor the pager resolves to an executable on `PATH`, a
    /// fatal construction error rather than something to silently default
    /// around.
    pub fn try_new() -> Result<Self, (&'static str, Vec<String>)> {
        let editor = resolve_executable(&["VISUAL", "EDITOR"], "nano", "notepad.exe")
            .ok_or_else(|| ("editor", vec!["VISUAL".to_string(), "EDITOR".to_string(), "nano".to_string()]))?;
        let pager = resolve_executable(&["PAGER"], "less", "notepad.exe").ok_or_else(|| ("pager", vec!["PAGER".to_string(), "less".to_string()]))?;
        Ok(Self { editor, pager })
    }
}

impl ProcessEditorLauncher {
    fn write_temp_file(contents: &[u8]) -> std::io::Result<PathBuf> {
        let mut path = env::temp_dir();
        path.push(format!("mume-mpi-{}.txt", std::process::id()));
        let crlf = to_crlf(contents);
        fs::write(&path, crlf)?;
        Ok(path)
    }
}

fn to_crlf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\n' && (i == 0 || data[i - 1] != b'\r') {
            out.push(b'\r');
        }
        out.push(data[i]);
        i += 1;
    }
    out
}

impl EditorLauncher for ProcessEditorLauncher {
    fn edit(&self, initial_contents: &[u8], output_format: MpiOutputFormat) -> std::io::Result<EditOutcome> {
        let path = Self::write_temp_file(initial_contents)?;
        let before = fs::metadata(&path)?.modified()?;
        match output_format {
            MpiOutputFormat::Tintin => {
                println!("MPICOMMAND:{}:MPICOMMAND", path.display());
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)?;
            }
            MpiOutputFormat::Normal => {
                Command::new(&self.editor).arg(&path).status()?;
            }
        }
        let after = fs::metadata(&path)?.modified()?;
        let changed = after != before;
        let contents = fs::read(&path)?;
        let _ = fs::remove_file(&path);
        Ok(EditOutcome { contents, changed })
    }

    fn view(&self, contents: &[u8], output_format: MpiOutputFormat) -> std::io::Result<()> {
        let path = Self::write_temp_file(contents)?;
        match output_format {
            MpiOutputFormat::Tintin => {
                println!("MPICOMMAND:{}:MPICOMMAND", path.display());
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)?;
            }
            MpiOutputFormat::Normal => {
                Command::new(&self.pager).arg(&path).status()?;
            }
        }
        let _ = fs::remove_file(&path);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MpiState {
    Data,
    Newline,
    Init,
    Command,
    Length,
    Body,
}

/// Strips `\n~$#E<cmd><len>\n<body>` messages out of the inline byte
/// stream, dispatching `E`/`V` to worker threads and forwarding everything
/// else as application data.
pub struct MpiHandler {
    is_client: bool,
    writer: Writer,
    receiver: Receiver,
    output_format: MpiOutputFormat,
    launcher: Arc<dyn EditorLauncher>,
    shared_writer: Arc<Mutex<ManagerShared>>,
    state: MpiState,
    app_data_buffer: Vec<u8>,
    init_buffer: Vec<u8>,
    command_byte: u8,
    length_digits: Vec<u8>,
    declared_length: usize,
    body_buffer: Vec<u8>,
    workers: Vec<JoinHandle<()>>,
}

impl MpiHandler {
    pub(crate) fn new(is_client: bool, writer: Writer, receiver: Receiver, output_format: MpiOutputFormat, launcher: Arc<dyn EditorLauncher>, shared_writer: Arc<Mutex<ManagerShared>>) -> Self {
        Self {
            is_client,
            writer,
            receiver,
            output_format,
            launcher,
            shared_writer,
            state: MpiState::Data,
            app_data_buffer: Vec::new(),
            init_buffer: Vec::new(),
            command_byte: 0,
            length_digits: Vec::new(),
            declared_length: 0,
            body_buffer: Vec::new(),
            workers: Vec::new(),
        }
    }

    fn flush_app_data(&mut self) {
        if !self.app_data_buffer.is_empty() {
            let data = std::mem::take(&mut self.app_data_buffer);
            (self.receiver)(&data);
        }
    }

    fn process_data_byte(&mut self, byte: u8) {
        self.app_data_buffer.push(byte);
        if byte == b'\n' {
            self.state = MpiState::Newline;
        }
    }

    fn process_newline_byte(&mut self, byte: u8) {
        if byte == SENTINEL[0] {
            self.init_buffer.clear();
            self.init_buffer.push(byte);
            self.state = MpiState::Init;
        } else {
            self.app_data_buffer.push(byte);
            self.state = if byte == b'\n' { MpiState::Newline } else { MpiState::Data };
        }
    }

    fn process_init_byte(&mut self, byte: u8) {
        self.init_buffer.push(byte);
        let matched_so_far = SENTINEL.starts_with(&self.init_buffer[..]);
        if !matched_so_far {
            self.app_data_buffer.extend_from_slice(&self.init_buffer);
            self.init_buffer.clear();
            self.state = if byte == b'\n' { MpiState::Newline } else { MpiState::Data };
            return;
        }
        if self.init_buffer.as_slice() == SENTINEL {
            self.flush_app_data();
            self.init_buffer.clear();
            self.state = MpiState::Command;
        }
    }

    fn process_command_byte(&mut self, byte: u8) {
        self.command_byte = byte;
        self.length_digits.clear();
        self.state = MpiState::Length;
    }

    fn process_length_byte(&mut self, byte: u8) {
        if byte == b'\n' {
            match std::str::from_utf8(&self.length_digits).ok().and_then(|s| s.parse::<usize>().ok()) {
                Some(length) => {
                    self.declared_length = length;
                    self.body_buffer.clear();
                    self.body_buffer.reserve(length);
                    self.state = MpiState::Body;
                }
                None => {
                    tracing::warn!("MPI message had no length digits before newline, treating as not-MPI");
                    self.reemit_aborted_message();
                }
            }
        } else if byte.is_ascii_digit() {
            self.length_digits.push(byte);
        } else {
            tracing::warn!(byte, "non-digit byte in MPI length field, treating as not-MPI");
            self.length_digits.push(byte);
            self.reemit_aborted_message();
        }
    }

    fn reemit_aborted_message(&mut self) {
        self.app_data_buffer.extend_from_slice(SENTINEL);
        self.app_data_buffer.push(self.command_byte);
        self.app_data_buffer.extend_from_slice(&self.length_digits);
        self.length_digits.clear();
        self.state = MpiState::Data;
    }

    fn process_body_byte(&mut self, byte: u8) {
        self.body_buffer.push(byte);
        if self.body_buffer.len() == self.declared_length {
            let command = self.command_byte;
            let body = std::mem::take(&mut self.body_buffer);
            self.state = MpiState::Data;
            self.dispatch_command(command, body);
        }
    }

    fn dispatch_command(&mut self, command: u8, body: Vec<u8>) {
        match command {
            b'E' => self.spawn_edit_worker(body),
            b'V' => self.spawn_view_worker(body),
            other => {
                tracing::warn!(command = other as char, "unknown MPI command byte, forwarding message unchanged");
                self.on_unhandled_command(other, &body);
            }
        }
    }

    /// Unknown command bytes re-emit the sentinel + command + body as
    /// application data, for forward compatibility.
    fn on_unhandled_command(&mut self, command: u8, body: &[u8]) {
        self.app_data_buffer.extend_from_slice(SENTINEL);
        self.app_data_buffer.push(command);
        self.app_data_buffer.extend_from_slice(body.len().to_string().as_bytes());
        self.app_data_buffer.push(b'\n');
        self.app_data_buffer.extend_from_slice(body);
    }

    fn spawn_edit_worker(&mut self, body: Vec<u8>) {
        let launcher = Arc::clone(&self.launcher);
        let shared_writer = Arc::clone(&self.shared_writer);
        let output_format = self.output_format;
        let handle = std::thread::spawn(move || {
            let Some((session_id, description, contents)) = split_edit_body(&body) else {
                tracing::warn!("malformed MPI edit body, missing session id or description line");
                return;
            };
            let _ = description;
            match launcher.edit(contents, output_format) {
                Ok(outcome) => {
                    let reply = if outcome.changed {
                        format_reply(b'E', session_id, Some(&outcome.contents))
                    } else {
                        format_cancel(session_id)
                    };
                    shared_writer.lock().expect("manager mutex poisoned").write_raw(&reply);
                }
                Err(err) => tracing::error!(error = %err, "MPI edit session failed"),
            }
        });
        self.workers.push(handle);
    }

    fn spawn_view_worker(&mut self, body: Vec<u8>) {
        let launcher = Arc::clone(&self.launcher);
        let output_format = self.output_format;
        let handle = std::thread::spawn(move || {
            if let Err(err) = launcher.view(&body, output_format) {
                tracing::error!(error = %err, "MPI view session failed");
            }
        });
        self.workers.push(handle);
    }

    /// Joins every outstanding edit/view worker thread. Called from
    /// `on_connection_lost`.
    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn split_edit_body(body: &[u8]) -> Option<(&[u8], &[u8], &[u8])> {
    let first_nl = body.iter().position(|&b| b == b'\n')?;
    let (session_id, rest) = body.split_at(first_nl);
    let rest = &rest[1..];
    let second_nl = rest.iter().position(|&b| b == b'\n')?;
    let (description, contents) = rest.split_at(second_nl);
    Some((session_id, description, &contents[1..]))
}

fn format_reply(command: u8, session_id: &[u8], contents: Option<&[u8]>) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.push(command);
    payload.extend_from_slice(session_id);
    payload.push(b'\n');
    if let Some(contents) = contents {
        let trimmed = trim_whitespace(contents);
        payload.extend_from_slice(trimmed);
        payload.push(b'\n');
    }
    let mut out = Vec::new();
    out.extend_from_slice(SENTINEL);
    out.push(b'E');
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(b'\n');
    out.extend_from_slice(&payload);
    out
}

fn format_cancel(session_id: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.push(b'C');
    payload.extend_from_slice(session_id);
    payload.push(b'\n');
    let mut out = Vec::new();
    out.extend_from_slice(SENTINEL);
    out.push(b'E');
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(b'\n');
    out.extend_from_slice(&payload);
    out
}

fn trim_whitespace(data: &[u8]) -> &[u8] {
    let is_space = |b: u8| b == b' ' || b == b'\n' || b == b'\r' || b == b'\t';
    let mut start = 0;
    while start < data.len() && is_space(data[start]) {
        start += 1;
    }
    let mut end = data.len();
    while end > start && is_space(data[end - 1]) {
        end -= 1;
    }
    &data[start..end]
}

impl ConnectionInterface for MpiHandler {
    fn is_client(&self) -> bool {
        self.is_client
    }

    fn write(&mut self, data: &[u8]) {
        (self.writer)(data);
    }

    fn on_connection_made(&mut self) {
        // Identifies this session for remote editing, per SPEC_FULL.md §3
        // (original_source's `mpi.py::on_connection_made`).
        let mut handshake = SENTINEL.to_vec();
        handshake.push(b'I');
        handshake.push(b'\n');
        self.write(&handshake);
    }

    fn on_connection_lost(&mut self) {
        self.join_workers();
    }

    fn on_data_received(&mut self, data: &[u8]) {
        for &byte in data {
            match self.state {
                MpiState::Data => self.process_data_byte(byte),
                MpiState::Newline => self.process_newline_byte(byte),
                MpiState::Init => self.process_init_byte(byte),
                MpiState::Command => self.process_command_byte(byte),
                MpiState::Length => self.process_length_byte(byte),
                MpiState::Body => self.process_body_byte(byte),
            }
        }
        self.flush_app_data();
    }
}
