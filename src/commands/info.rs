use anyhow::bail;

use crate::context::Context;

/// `info s1`
///
/// Prints the inode behind a path without following a final symlink:
///   NAME - SIZE - i-node NUMBER - KIND PERM links N - zones Z1 Z2 ...
///
/// Outputs: the line above, `FILE NOT FOUND`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [path] = argv else {
        bail!("usage: info <path>");
    };
    let ino = context.resolve_nofollow(path)?;
    let fs = context.fs_mut()?;
    let attr = fs.stat(ino)?;
    let inode = fs.read_inode(ino)?;
    let zones: Vec<String> = inode
        .record()
        .zones
        .iter()
        .filter(|&&z| z != 0)
        .map(|z| z.to_string())
        .collect();
    println!(
        "{} - {} - i-node {} - {:?} {:o} links {} - zones {}",
        path.trim_end_matches('/').rsplit('/').next().unwrap_or_default(),
        attr.size,
        attr.ino,
        attr.kind,
        attr.perm,
        attr.nlinks,
        if zones.is_empty() { "-".to_string() } else { zones.join(" ") }
    );
    Ok(())
}
