use anyhow::bail;

use crate::context::Context;

/// `ln s1 s2`
///
/// Adds the hard link `s2` for the existing file `s1`.
///
/// Outputs: `OK`, `FILE NOT FOUND`, `EXIST`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [target, link] = argv else {
        bail!("usage: ln <existing> <new>");
    };
    let ino = context.resolve_nofollow(target)?;
    let (parent, name) = context.resolve_parent(link)?;
    context.fs_mut()?.link(ino, parent, name.as_bytes())?;
    println!("OK");
    Ok(())
}
