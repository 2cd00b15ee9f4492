// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

#![no_main]

use libfuzzer_sys::fuzz_target;
use typelib::import::{ImportConfig, YamlImporter};
use typelib::{MemoryLayout, Registry};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut registry = Registry::standard().unwrap();
    let _ = YamlImporter.load_str(text, &ImportConfig::new(), &mut registry);

    // Whatever got defined must compile or fail cleanly.
    for ty in registry.iter() {
        let _ = MemoryLayout::compile(&registry, ty);
    }
});
