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

//! Benchmarks for the handler-chain manager and its protocol mix-ins.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mudproto::manager::{HandlerSpec, Manager};

fn manager_with_telnet() -> Manager {
    let mut manager = Manager::new(true, Box::new(|_: &[u8]| {}), Box::new(|_: &[u8]| {}), None);
    manager.register(HandlerSpec::Telnet { charset: true, naws: true, gmcp: None }).unwrap();
    manager.connect();
    manager
}

fn bench_parse_plain_data_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_parse_plain_data_sizes");

    for size in [10, 100, 1000, 10000].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let data: Vec<u8> = (0..size).map(|i| (i % 255) as u8).collect();
            b.iter(|| {
                let mut manager = manager_with_telnet();
                manager.parse(black_box(&data));
            });
        });
    }

    group.finish();
}

fn bench_write_with_escape(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_write_with_escape");

    group.bench_function("prompt_and_escape", |b| {
        b.iter(|| {
            let mut manager = manager_with_telnet();
            manager.write(black_box(b"> "), true, true);
        });
    });

    group.finish();
}

fn bench_register_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_register_chain");

    group.bench_function("telnet_with_mixins", |b| {
        b.iter(|| {
            let mut manager = Manager::new(true, Box::new(|_: &[u8]| {}), Box::new(|_: &[u8]| {}), None);
            manager.register(HandlerSpec::Mccp).unwrap();
            manager.register(HandlerSpec::Telnet { charset: true, naws: true, gmcp: None }).unwrap();
            manager.connect();
            black_box(&manager);
        });
    });

    group.finish();
}

criterion_group!(manager_benches, bench_parse_plain_data_sizes, bench_write_with_escape, bench_register_chain);

criterion_main!(manager_benches);
