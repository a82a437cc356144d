#![allow(dead_code)]

use std::process::{Command, Output};

pub fn phptobpc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_phptobpc"))
}

/// Write `source` to a temp file and run the binary on it.
pub fn run_on_source(source: &str) -> Output {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("input.php");
    std::fs::write(&src_path, source).unwrap();
    phptobpc().arg(&src_path).output().unwrap()
}

/// Convert and strip the `<?php` header so assertions can focus on statements.
pub fn convert_body(source: &str) -> String {
    let out = phptobpc::convert(source).unwrap_or_else(|e| panic!("conversion failed: {e}\nsource:\n{source}"));
    out.strip_prefix("<?php\n\n").unwrap_or(&out).trim_end().to_string()
}
