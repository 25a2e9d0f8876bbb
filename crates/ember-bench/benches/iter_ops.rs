//! Criterion micro-benchmarks for the iterators and the walker.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ember_bench::{reference_payload, reference_store, text_of_len, REFERENCE_PAYLOAD_LEN};
use ember_core::ElementType;
use ember_iter::{ArrayBufferIter, StringIter, Walker};

fn bench_string_iter(c: &mut Criterion) {
    let store = reference_store().unwrap();
    let chain = store.new_bytes(&text_of_len(1024)).unwrap();
    c.bench_function("string_iter_read_1k", |b| {
        b.iter(|| {
            let mut it = StringIter::new(&chain, 0).unwrap();
            let mut sum = 0u32;
            while it.has_char() {
                sum += u32::from(it.get_char());
                it.next();
            }
            black_box(sum);
        });
    });
    c.bench_function("string_iter_append_256", |b| {
        b.iter(|| {
            let s = store.new_empty_string().unwrap();
            let mut it = StringIter::new(&s, 0).unwrap();
            for i in 0..256u32 {
                it.append(b'a' + (i % 26) as u8);
            }
            black_box(it.get_index());
        });
    });
}

fn bench_buffer_iter(c: &mut Criterion) {
    let store = reference_store().unwrap();
    let buf = store.new_typed_array(ElementType::Int16, 512).unwrap();
    c.bench_function("int16_write_read_512", |b| {
        b.iter(|| {
            let mut it = ArrayBufferIter::new(&buf, 0).unwrap();
            let mut i = 0;
            while it.has_element() {
                it.set_int(i).unwrap();
                it.next();
                i += 1;
            }
            let mut it = ArrayBufferIter::new(&buf, 0).unwrap();
            let mut sum = 0i64;
            while it.has_element() {
                sum += i64::from(it.get_int().unwrap());
                it.next();
            }
            black_box(sum);
        });
    });
}

fn bench_walker(c: &mut Criterion) {
    let store = reference_store().unwrap();
    let payload = reference_payload(&store).unwrap();
    let walker = Walker::default();
    assert_eq!(
        walker.iterate_callback_count(&payload).unwrap(),
        REFERENCE_PAYLOAD_LEN
    );
    c.bench_function("walk_reference_payload", |b| {
        b.iter(|| {
            let mut sum = 0i64;
            walker
                .iterate_callback(black_box(&payload), &mut |v| sum += i64::from(v))
                .unwrap();
            black_box(sum);
        });
    });
}

criterion_group!(benches, bench_string_iter, bench_buffer_iter, bench_walker);
criterion_main!(benches);
