extern crate rtassembly;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rtassembly::{file::Memory, Module, RawResource, ResourceStream};
use std::{
    hint::black_box,
    io::{Read, Seek, SeekFrom},
    sync::Arc,
};

const RESOURCE_SIZE: usize = 1024 * 1024;

/// Reading a 1 MiB resource through the bounded view, whole and in chunks.
fn bench_resource_stream(c: &mut Criterion) {
    let image: Vec<u8> = (0..RESOURCE_SIZE + 64).map(|i| i as u8).collect();
    let module = Arc::new(Module::new("Bench.dll").with_image(Memory::new(image)));

    let mut group = c.benchmark_group("resource_stream");
    group.throughput(Throughput::Bytes(RESOURCE_SIZE as u64));

    group.bench_function("read_to_end", |b| {
        b.iter(|| {
            let raw = RawResource::from_module_image(Arc::clone(&module), 64, RESOURCE_SIZE).unwrap();
            let mut stream = ResourceStream::acquire(raw);
            let mut bytes = Vec::with_capacity(RESOURCE_SIZE);
            stream.read_to_end(&mut bytes).unwrap();
            black_box(bytes)
        });
    });

    group.bench_function("read_bytes_4k", |b| {
        let raw = RawResource::from_module_image(Arc::clone(&module), 64, RESOURCE_SIZE).unwrap();
        let mut stream = ResourceStream::acquire(raw);
        b.iter(|| {
            stream.seek(SeekFrom::Start(0)).unwrap();
            let mut checksum = 0u8;
            while let Ok(chunk) = stream.read_bytes(4096) {
                checksum ^= chunk[0];
            }
            black_box(checksum)
        });
    });

    group.finish();

    c.bench_function("acquire_release", |b| {
        b.iter(|| {
            let raw = RawResource::from_module_image(Arc::clone(&module), 64, 37).unwrap();
            let mut stream = ResourceStream::acquire(black_box(raw));
            stream.release().unwrap();
        });
    });
}

criterion_group!(benches, bench_resource_stream);
criterion_main!(benches);
