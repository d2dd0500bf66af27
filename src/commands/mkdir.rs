use anyhow::bail;

use crate::context::Context;

/// `mkdir a1`
///
/// Creates a directory. Prints `OK`, or `PATH NOT FOUND` when the parent does
/// not exist and `EXIST` when the name is taken.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [path] = argv else {
        bail!("usage: mkdir <path>");
    };
    let (parent, name) = context.resolve_parent(path)?;
    context.fs_mut()?.mkdir(parent, name.as_bytes(), 0o755)?;
    println!("OK");
    Ok(())
}
