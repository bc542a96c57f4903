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

//! Benchmarks for telnetcodec performance.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mudproto_telnet::constants::{DO, ECHO, IAC, SGA};
use mudproto_telnet::{ConnectionInterface, TelnetHandler};

fn handler(is_client: bool) -> TelnetHandler {
    TelnetHandler::new(is_client, Box::new(|_: &[u8]| {}), Box::new(|_: &[u8]| {}))
}

fn bench_plain_data_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain_data_sizes");

    for size in [10, 100, 1000, 10000].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            // Avoid 0xFF so every byte stays in the DATA state.
            let data: Vec<u8> = (0..size).map(|i| (i % 255) as u8).collect();
            b.iter(|| {
                let mut h = handler(true);
                h.on_data_received(black_box(&data));
            });
        });
    }

    group.finish();
}

fn bench_escaped_iac(c: &mut Criterion) {
    let mut group = c.benchmark_group("escaped_iac");

    group.bench_function("single_pair", |b| {
        b.iter(|| {
            let mut h = handler(true);
            h.on_data_received(black_box(&[IAC, IAC]));
        });
    });

    group.finish();
}

fn bench_negotiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("negotiation");

    group.bench_function("do_echo", |b| {
        b.iter(|| {
            let mut h = handler(true);
            h.on_data_received(black_box(&[IAC, DO, ECHO]));
        });
    });

    group.finish();
}

fn bench_subnegotiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("subnegotiation");

    group.bench_function("naws", |b| {
        let frame = [IAC, 250, 31, 0, 80, 0, 24, IAC, 240];
        b.iter(|| {
            let mut h = handler(false);
            h.on_data_received(black_box(&frame));
        });
    });

    group.finish();
}

fn bench_mixed_content(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_content");

    group.bench_function("data_with_negotiation", |b| {
        let mut frame = Vec::new();
        frame.extend_from_slice(b"Test");
        frame.extend_from_slice(&[IAC, DO, ECHO]);
        frame.extend_from_slice(b"Data");
        b.iter(|| {
            let mut h = handler(true);
            h.on_data_received(black_box(&frame));
        });
    });

    group.finish();
}

fn bench_option_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("option_state");

    group.bench_function("will", |b| {
        b.iter(|| {
            let mut h = handler(true);
            h.will(black_box(SGA));
        });
    });

    group.bench_function("is_enabled_local", |b| {
        let h = handler(true);
        b.iter(|| {
            h.core().is_enabled_local(black_box(SGA));
        });
    });

    group.finish();
}

fn bench_realistic_scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("realistic_scenarios");

    group.bench_function("option_negotiation_sequence", |b| {
        b.iter(|| {
            let mut server = handler(false);
            server.do_(black_box(ECHO));
            server.do_(black_box(SGA));
            let mut client = handler(true);
            client.on_data_received(black_box(&[IAC, DO, ECHO, IAC, DO, SGA]));
        });
    });

    group.bench_function("streaming_text", |b| {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(10);
        b.iter(|| {
            let mut h = handler(true);
            h.on_data_received(black_box(text.as_bytes()));
        });
    });

    group.finish();
}

criterion_group!(
    telnet_benches,
    bench_plain_data_sizes,
    bench_escaped_iac,
    bench_negotiation,
    bench_subnegotiation,
    bench_mixed_content,
    bench_option_state,
    bench_realistic_scenarios
);

criterion_main!(telnet_benches);
