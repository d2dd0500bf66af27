//! `clear` command.
//!
//! Clears the terminal with ANSI escapes (ESC[2J erase, ESC[H home) and
//! reprints the greeting. Extra arguments are ignored; the filesystem is not
//! touched.
use std::io::Write;

use crate::context::Context;
use crate::utils::tui;

pub fn handle_argv(_argv: &[&str], _context: &mut Context) -> anyhow::Result<()> {
    print!("\x1B[2J\x1B[H");
    std::io::stdout().flush()?;
    tui::write_greet();
    Ok(())
}
