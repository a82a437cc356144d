#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else { return };
    // Whatever parses must convert and re-parse
    if let Ok(output) = phptobpc::convert(&format!("<?php {s}")) {
        assert!(phptobpc::parse_source(&output).is_ok(), "output does not re-parse:\n{output}");
    }
});
