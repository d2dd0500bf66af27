use anyhow::bail;

use super::incp::target_in;
use crate::context::Context;

/// `mv s1 s2`
///
/// Renames or moves `s1`. When `s2` is an existing directory the entry moves
/// into it under its old name; an existing file `s2` is replaced.
///
/// Outputs: `OK`, `FILE NOT FOUND`, `PATH NOT FOUND`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [source, dest] = argv else {
        bail!("usage: mv <source> <dest>");
    };
    let (old_dir, old_name) = context.resolve_parent(source)?;
    let (new_dir, new_name) = target_in(context, dest, source)?;
    context
        .fs_mut()?
        .rename(old_dir, old_name.as_bytes(), new_dir, new_name.as_bytes())?;
    println!("OK");
    Ok(())
}
