use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use phptobpc::diagnostics::{self, CompileError};

#[derive(Parser)]
#[command(name = "phptobpc", version, about = "Flatten namespaced PHP into the BPC dialect")]
struct Cli {
    /// Source file path
    file: PathBuf,
}

fn main() {
    // usage errors exit with 1, help and version with 0
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            let _ = e.print();
            std::process::exit(1);
        }
        e.exit()
    });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let filename = cli.file.to_string_lossy().to_string();
    let source = match std::fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            let err = CompileError::io(format!("failed to read {filename}: {e}"), cli.file.clone());
            diagnostics::render_error("", &filename, &err);
            std::process::exit(1);
        }
    };

    match phptobpc::convert(&source) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            if let CompileError::Syntax { msg, .. } = &err {
                eprintln!("Parse Error: {msg}");
            }
            diagnostics::render_error(&source, &filename, &err);
            std::process::exit(1);
        }
    }
}
