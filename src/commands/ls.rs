use anyhow::bail;
use mzfs::fs::FileKind;

use crate::context::Context;

/// `ls [path]`
///
/// Lists a directory (the working one by default), one line per entry:
///   FILE: <name>
///   DIR: <name>
///   SYMLINK: <name>
///   SPECIAL: <name>
/// A non-directory path prints just its own line.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let target = match argv {
        [] => ".",
        [path] => *path,
        _ => bail!("usage: ls [path]"),
    };
    let ino = context.resolve(target)?;
    let fs = context.fs_mut()?;
    let kind = fs.stat(ino)?.kind;
    if kind != FileKind::Directory {
        println!("{}", line(kind, basename(target)));
        return Ok(());
    }

    let listing = fs.readdir(ino, 0)?;
    for entry in &listing.entries {
        if entry.name == b"." || entry.name == b".." {
            continue;
        }
        let kind = fs.stat(entry.ino)?.kind;
        println!("{}", line(kind, &entry.name_str()));
    }
    Ok(())
}

fn line(kind: FileKind, name: &str) -> String {
    let tag = match kind {
        FileKind::Regular => "FILE",
        FileKind::Directory => "DIR",
        FileKind::Symlink => "SYMLINK",
        _ => "SPECIAL",
    };
    format!("{tag}: {name}")
}

fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some("") | None => "/",
        Some(b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_of_paths() {
        assert_eq!(basename("/a/b"), "b");
        assert_eq!(basename("b/"), "b");
        assert_eq!(basename("/"), "/");
        assert_eq!(line(FileKind::Symlink, "x"), "SYMLINK: x");
    }
}
