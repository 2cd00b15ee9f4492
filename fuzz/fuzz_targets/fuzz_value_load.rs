// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

#![no_main]

use libfuzzer_sys::fuzz_target;
use typelib::{CompoundBuilder, Registry, Value};

fn registry() -> Registry {
    let mut reg = Registry::standard().unwrap();
    let id = reg.build("/int32_t").unwrap();
    let values = reg.build("/std/vector</std/vector</int16_t>>").unwrap();
    let name = reg.build("/std/string").unwrap();
    let pair = reg
        .add_compound(CompoundBuilder::new("/Pair").field("id", id).field("name", name))
        .unwrap();
    let pairs = reg.build("/std/vector</Pair>[2]").unwrap();
    reg.add_compound(
        CompoundBuilder::new("/Root")
            .field("head", pair)
            .field("values", values)
            .field("pairs", pairs),
    )
    .unwrap();
    reg
}

fuzz_target!(|data: &[u8]| {
    let reg = registry();
    let mut value = Value::of(&reg, "/Root").unwrap();

    // Any input either loads or fails, leaving a value that dumps back
    // to as many bytes as it reports.
    let loaded = value.load_from_slice(data).is_ok();
    let dumped = value.dump_to_vec().unwrap();
    assert_eq!(dumped.len(), value.dump_size());
    if loaded {
        assert_eq!(dumped, data);
    }
});
