use anyhow::bail;

use crate::context::Context;

/// `rmdir a1`
///
/// Removes an empty directory.
///
/// Outputs: `OK`, `FILE NOT FOUND`, `NOT EMPTY`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [path] = argv else {
        bail!("usage: rmdir <path>");
    };
    let (parent, name) = context.resolve_parent(path)?;
    let target = context.resolve_nofollow(path)?;
    if target == context.cwd() {
        bail!("cannot remove the working directory");
    }
    context.fs_mut()?.rmdir(parent, name.as_bytes())?;
    println!("OK");
    Ok(())
}
