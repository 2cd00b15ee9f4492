// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors
//!
//! Benchmark: layout compilation and layout-driven value operations
//!
//! Compares the single-span fast path (flat types) with the interpreted
//! path (types holding containers).

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use typelib::{CompoundBuilder, EndianSwap, MemoryLayout, Registry, Value, ValueOps};

// ============================================================================
// Fixtures
// ============================================================================

/// `Flat { int32_t id; double pos[3]; uint8_t flags[16]; }` and
/// `Nested { Flat head; std::vector<Flat> trail; std::string name; }`.
fn registry() -> Registry {
    let mut reg = Registry::standard().unwrap();
    let id = reg.build("/int32_t").unwrap();
    let pos = reg.build("/double[3]").unwrap();
    let flags = reg.build("/uint8_t[16]").unwrap();
    let flat = reg
        .add_compound(
            CompoundBuilder::new("/Flat")
                .field("id", id)
                .field("pos", pos)
                .field("flags", flags),
        )
        .unwrap();
    let trail = reg.build("/std/vector</Flat>").unwrap();
    let name = reg.build("/std/string").unwrap();
    reg.add_compound(
        CompoundBuilder::new("/Nested")
            .field("head", flat)
            .field("trail", trail)
            .field("name", name),
    )
    .unwrap();
    reg
}

fn nested_value(reg: &Registry, len: usize) -> Value<'_> {
    let mut value = Value::of(reg, "/Nested").unwrap();
    {
        let mut trail = value.field_mut("trail").unwrap();
        for i in 0..len {
            let mut item = trail.push_default().unwrap();
            item.field_mut("id").unwrap().set(i as i32).unwrap();
        }
    }
    value.field_mut("name").unwrap().set_string("benchmark").unwrap();
    value
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_compile(c: &mut Criterion) {
    let reg = registry();
    let flat = reg.find("/Flat").unwrap();
    let nested = reg.find("/Nested").unwrap();

    c.bench_function("layout_compile_flat", |b| {
        b.iter(|| MemoryLayout::compile(&reg, black_box(flat)).unwrap())
    });
    c.bench_function("layout_compile_nested", |b| {
        b.iter(|| MemoryLayout::compile(&reg, black_box(nested)).unwrap())
    });
    c.bench_function("endian_compile_flat", |b| {
        b.iter(|| EndianSwap::compile(&reg, black_box(flat)).unwrap())
    });
}

fn bench_copy(c: &mut Criterion) {
    let reg = registry();
    let flat = reg.find("/Flat").unwrap();
    let ops = ValueOps::new(&reg, flat).unwrap();
    let src = vec![0x5au8; flat.size()];
    let mut dst = vec![0u8; flat.size()];

    c.bench_function("value_copy_flat", |b| {
        // SAFETY: flat types hold no container slots.
        b.iter(|| unsafe { ops.copy(black_box(&mut dst), black_box(&src)) })
    });

    let nested = nested_value(&reg, 64);
    c.bench_function("value_clone_nested_64", |b| b.iter(|| black_box(&nested).clone()));
    c.bench_function("value_compare_nested_64", |b| {
        let other = nested.clone();
        b.iter(|| black_box(&nested) == black_box(&other))
    });
}

fn bench_dump_load(c: &mut Criterion) {
    let reg = registry();
    let nested = nested_value(&reg, 64);
    let bytes = nested.dump_to_vec().unwrap();

    c.bench_function("value_dump_nested_64", |b| {
        let mut out = Vec::with_capacity(bytes.len());
        b.iter(|| {
            out.clear();
            nested.dump(&mut out).unwrap();
        })
    });
    c.bench_function("value_load_nested_64", |b| {
        b.iter_batched(
            || Value::of(&reg, "/Nested").unwrap(),
            |mut value| {
                value.load_from_slice(black_box(&bytes)).unwrap();
                value
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_endian(c: &mut Criterion) {
    let reg = registry();
    let flat = reg.find("/Flat").unwrap();
    let swap = EndianSwap::compile(&reg, flat).unwrap();
    let input = vec![0x11u8; flat.size()];
    let mut output = vec![0u8; flat.size()];

    c.bench_function("endian_apply_flat", |b| {
        b.iter(|| swap.apply(black_box(&input), black_box(&mut output)))
    });
}

criterion_group!(compile_benches, bench_compile);
criterion_group!(value_benches, bench_copy, bench_dump_load);
criterion_group!(endian_benches, bench_endian);
criterion_main!(compile_benches, value_benches, endian_benches);
