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

//! End-to-end scenarios exercising the manager-composed chain (MCCP
//! splicing, MPI framing, XML tagging) rather than bare Telnet.

use std::io::Write as _;
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::ZlibEncoder;

use mudproto::manager::{HandlerSpec, Manager};
use mudproto::mpi::{EditOutcome, EditorLauncher, MpiOutputFormat};
use mudproto_telnet::connection::Receiver;
use mudproto_telnet::constants::{IAC, MCCP2, SB, SE};

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn scenario_5_mccp2_activation_mid_stream() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);
    let receiver: Receiver = Box::new(move |data: &[u8]| received_clone.lock().unwrap().extend_from_slice(data));

    let mut manager = Manager::new(true, Box::new(|_: &[u8]| {}), receiver, None);
    manager.register(HandlerSpec::Mccp).unwrap();
    manager.register(HandlerSpec::Telnet { charset: false, naws: false, gmcp: None }).unwrap();
    manager.connect();

    // The peer offers MCCP2; the Telnet core's MccpDelegate accepts it,
    // which is what tells the MccpHandler splicer to watch for the
    // activation sentinel at all.
    manager.parse(&[IAC, mudproto_telnet::constants::WILL, MCCP2]);
    received.lock().unwrap().clear();

    let mut input = b"hello".to_vec();
    input.extend_from_slice(&[IAC, SB, MCCP2, IAC, SE]);
    input.extend_from_slice(&zlib(b"world"));
    manager.parse(&input);
    assert_eq!(&*received.lock().unwrap(), b"helloworld");
}

struct StubLauncher {
    view_calls: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl EditorLauncher for StubLauncher {
    fn edit(&self, _initial_contents: &[u8], _output_format: MpiOutputFormat) -> std::io::Result<EditOutcome> {
        Ok(EditOutcome { contents: Vec::new(), changed: false })
    }

    fn view(&self, contents: &[u8], _output_format: MpiOutputFormat) -> std::io::Result<()> {
        self.view_calls.lock().unwrap().push(contents.to_vec());
        Ok(())
    }
}

#[test]
fn scenario_6_mpi_view_message() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);
    let receiver: Receiver = Box::new(move |data: &[u8]| received_clone.lock().unwrap().extend_from_slice(data));

    let view_calls = Arc::new(Mutex::new(Vec::new()));
    let launcher: Arc<dyn EditorLauncher> = Arc::new(StubLauncher { view_calls: Arc::clone(&view_calls) });

    let mut manager = Manager::new(true, Box::new(|_: &[u8]| {}), receiver, None);
    manager.register(HandlerSpec::Mpi { output_format: MpiOutputFormat::Normal, launcher: Some(launcher) }).unwrap();
    manager.connect();

    let body = b"HELLO";
    let mut input = b"before\n~$#E".to_vec();
    input.push(b'V');
    input.extend_from_slice(body.len().to_string().as_bytes());
    input.push(b'\n');
    input.extend_from_slice(body);
    manager.parse(&input);
    manager.disconnect();

    assert_eq!(&*received.lock().unwrap(), b"before\n");
    assert_eq!(&*view_calls.lock().unwrap(), &[b"HELLO".to_vec()]);
}

#[test]
fn scenario_7_xml_room_event() {
    use mudproto::xml::XmlOutputFormat;

    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);
    let receiver: Receiver = Box::new(move |data: &[u8]| received_clone.lock().unwrap().extend_from_slice(data));

    let mut manager = Manager::new(true, Box::new(|_: &[u8]| {}), receiver, None);
    manager.register(HandlerSpec::Xml { output_format: XmlOutputFormat::Normal }).unwrap();
    manager.connect();
    manager.parse(b"<room id=1><name>Foo</name>bar<exits>n</exits></room>");

    // Event emission order is covered directly against `XmlHandler` in its
    // own unit tests; here we confirm the manager-composed chain delivers
    // the same clean text stream.
    assert_eq!(&*received.lock().unwrap(), b"Foobarn");
}
