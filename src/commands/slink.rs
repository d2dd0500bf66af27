//! `slink s1 s2`
//!
//! Creates the symbolic link `s2` pointing at `s1`. The target is stored as
//! given and resolved on use, so it may dangle.
//!
//! Outputs:
//!   OK
//!   PATH NOT FOUND  (parent of s2 missing)
//!   EXIST
//!   NAME TOO LONG   (target over 49 bytes)
use anyhow::bail;

use crate::context::Context;

pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [target, link] = argv else {
        bail!("usage: slink <target> <link>");
    };
    let (parent, name) = context.resolve_parent(link)?;
    context
        .fs_mut()?
        .symlink(parent, name.as_bytes(), target.as_bytes())?;
    println!("OK");
    Ok(())
}
