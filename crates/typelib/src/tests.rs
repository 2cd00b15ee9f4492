// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Scenarios crossing the registry, the compilers and the value engine.

use crate::{
    contains_category, Category, CompoundBuilder, ContainerKind, EndianSwap, EnumBuilder, LayoutOp, MemoryLayout,
    Registry, Value, VectorKind,
};

/// `struct Frame { uint16_t a; uint32_t b; Mode c; double d[2]; }`
fn frame_registry() -> Registry {
    let mut reg = Registry::standard().unwrap();
    let mode = reg
        .add_enum(EnumBuilder::new("/Mode").value("IDLE", 0).value("RUN", 2))
        .unwrap();
    let a = reg.build("/uint16_t").unwrap();
    let b = reg.build("/uint32_t").unwrap();
    let d = reg.build("/double[2]").unwrap();
    reg.add_compound(
        CompoundBuilder::new("/Frame")
            .field("a", a)
            .field("b", b)
            .field("c", mode)
            .field("d", d),
    )
    .unwrap();
    reg
}

/// `struct Item { int16_t a; std::vector<int32_t> v; uint8_t flags[3]; }`
fn item_registry() -> Registry {
    let mut reg = Registry::standard().unwrap();
    let a = reg.build("/int16_t").unwrap();
    let v = reg.build("/std/vector</int32_t>").unwrap();
    let flags = reg.build("/uint8_t[3]").unwrap();
    reg.add_compound(
        CompoundBuilder::new("/Item")
            .field("a", a)
            .field("v", v)
            .field("flags", flags),
    )
    .unwrap();
    reg
}

#[test]
fn swapped_value_reads_back_reversed() {
    let reg = frame_registry();
    let frame = reg.find("/Frame").unwrap();
    let mut value = Value::new(&reg, frame).unwrap();
    value.field_mut("a").unwrap().set(0x0102u16).unwrap();
    value.field_mut("b").unwrap().set(0x0102_0304u32).unwrap();
    value.field_mut("c").unwrap().set_symbol("RUN").unwrap();
    value
        .field_mut("d")
        .unwrap()
        .item_mut(0)
        .unwrap()
        .set(1.5f64)
        .unwrap();

    let swap = EndianSwap::compile(&reg, frame).unwrap();
    let mut swapped_bytes = vec![0u8; frame.size()];
    swap.apply(value.as_bytes(), &mut swapped_bytes);

    let swapped = Value::from_bytes(&reg, frame, &swapped_bytes).unwrap();
    assert_eq!(swapped.field("a").unwrap().get::<u16>().unwrap(), 0x0201);
    assert_eq!(
        swapped.field("b").unwrap().get::<u32>().unwrap(),
        0x0102_0304u32.swap_bytes()
    );
    assert_eq!(
        swapped.field("c").unwrap().enum_value().unwrap(),
        i64::from(2i32.swap_bytes())
    );
    let d0 = swapped.field("d").unwrap().item(0).unwrap().get::<f64>().unwrap();
    assert_eq!(d0.to_bits(), 1.5f64.to_bits().swap_bytes());

    let mut back = vec![0u8; frame.size()];
    swap.apply(&swapped_bytes, &mut back);
    assert_eq!(back, value.as_bytes());
}

#[test]
fn layout_of_nested_container_type() {
    let reg = item_registry();
    let item = reg.find("/Item").unwrap();
    let v = item.field("v").unwrap();
    let slot = VectorKind::default().size();
    let tail = item.size() - v.offset() - slot;

    let layout = MemoryLayout::compile(&reg, item).unwrap();
    assert_eq!(
        layout.ops(),
        [
            LayoutOp::Memcpy(v.offset()),
            LayoutOp::Container(v.ty()),
            LayoutOp::Memcpy(4),
            LayoutOp::End,
            LayoutOp::Memcpy(tail),
        ]
    );
    assert!(EndianSwap::compile(&reg, item).is_err());
}

#[test]
fn layout_flatness_agrees_with_category_search() {
    let mut reg = item_registry();
    frame_registry_into(&mut reg);
    for name in ["/Item", "/Frame", "/Item[2]", "/Frame[3][2]", "/std/vector</Frame>", "/std/string"] {
        let id = reg.build(name).unwrap();
        let ty = reg.get_by_id(id);
        let layout = MemoryLayout::compile(&reg, ty).unwrap();
        assert_eq!(
            layout.is_memcpy(),
            !contains_category(&reg, ty, Category::Container),
            "{}",
            name
        );
    }
}

fn frame_registry_into(reg: &mut Registry) {
    reg.merge(&frame_registry()).unwrap();
}

#[test]
fn merged_registry_values_are_interchangeable() {
    let source = item_registry();
    let mut target = Registry::standard().unwrap();
    target.merge(&source).unwrap();
    target.merge(&source).unwrap();

    let mut original = Value::of(&source, "/Item").unwrap();
    original.field_mut("a").unwrap().set(-3i16).unwrap();
    {
        let mut v = original.field_mut("v").unwrap();
        for i in [4i32, 5, 6] {
            v.push_scalar(i).unwrap();
        }
    }
    let bytes = original.dump_to_vec().unwrap();

    let mut copy = Value::of(&target, "/Item").unwrap();
    copy.load_from_slice(&bytes).unwrap();
    assert_eq!(copy.dump_to_vec().unwrap(), bytes);
    assert_eq!(copy.to_string(), original.to_string());
    assert_eq!(copy.to_string(), "{ a = -3, v = [4, 5, 6], flags = [0, 0, 0] }");
}

#[test]
fn randomized_dump_load_round_trip() {
    let mut reg = item_registry();
    let items = reg.build("/std/vector</Item>").unwrap();
    let ty = reg.get_by_id(items);
    let mut rng = fastrand::Rng::with_seed(0x7e57);

    for _ in 0..16 {
        let mut value = Value::new(&reg, ty).unwrap();
        {
            let mut list = value.view_mut();
            for _ in 0..rng.usize(0..6) {
                let mut item = list.push_default().unwrap();
                item.field_mut("a").unwrap().set(rng.i16(..)).unwrap();
                let mut v = item.field_mut("v").unwrap();
                for _ in 0..rng.usize(0..8) {
                    v.push_scalar(rng.i32(..)).unwrap();
                }
            }
        }

        let bytes = value.dump_to_vec().unwrap();
        assert_eq!(bytes.len(), value.dump_size());

        let mut loaded = Value::new(&reg, ty).unwrap();
        loaded.load_from_slice(&bytes).unwrap();
        assert_eq!(loaded, value);

        let copy = loaded.clone();
        assert_eq!(copy, value);
    }
}

#[test]
fn registry_dump_lists_builtin_aliases() {
    let reg = Registry::standard().unwrap();
    let mut out = Vec::new();
    reg.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.lines().any(|l| l.starts_with("/int32_t") && l.contains("numeric")));
    assert!(text.lines().any(|l| l.starts_with("/std/string ") && l.contains("-> /std/string</int8_t>")));
}
