use anyhow::bail;

use crate::context::Context;

/// `rm s1`
///
/// Removes a file or symlink name. The data goes away with the last link.
///
/// Outputs: `OK`, `FILE NOT FOUND`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [path] = argv else {
        bail!("usage: rm <path>");
    };
    let (parent, name) = context.resolve_parent(path)?;
    context.fs_mut()?.unlink(parent, name.as_bytes())?;
    println!("OK");
    Ok(())
}
