use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::bail;
use mzfs::fs::FsError;

use crate::commands::Registry;
use crate::context::Context;

/// Nesting limit for `load` inside loaded scripts.
const MAX_LOAD_DEPTH: usize = 8;

thread_local! {
    static DEPTH: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// `load s1`
///
/// Runs the commands of a host file, one per line, exactly as if typed.
/// Empty lines and lines starting with `#` are skipped. Failing commands print
/// their status and the script goes on.
///
/// Outputs: `OK` after the last line, `FILE NOT FOUND`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [host_path] = argv else {
        bail!("usage: load <host file>");
    };
    let file = File::open(host_path).map_err(|_| FsError::NotFound)?;
    if DEPTH.get() >= MAX_LOAD_DEPTH {
        bail!("load nested too deeply");
    }

    let registry = Registry::new();
    DEPTH.set(DEPTH.get() + 1);
    let outcome = run_lines(&registry, BufReader::new(file), context);
    DEPTH.set(DEPTH.get() - 1);
    outcome?;

    println!("OK");
    Ok(())
}

fn run_lines(registry: &Registry, reader: impl BufRead, context: &mut Context) -> anyhow::Result<()> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut it = trimmed.split_whitespace();
        let Some(cmd) = it.next() else {
            continue;
        };
        let args: Vec<&str> = it.collect();
        registry.dispatch(cmd, &args, context);
    }
    Ok(())
}
