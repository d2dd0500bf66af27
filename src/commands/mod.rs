use std::collections::HashMap;

use colored::Colorize;
use mzfs::fs::FsError;

pub use crate::context::Context;

type Handler = fn(&[&str], &mut Context) -> anyhow::Result<()>;

pub struct Registry {
    pub map: HashMap<&'static str, Handler>,
}

impl Registry {
    pub fn new() -> Self {
        let mut map: HashMap<&'static str, Handler> = HashMap::new();
        map.insert("format", format::handle_argv);
        map.insert("mkdir", mkdir::handle_argv);
        map.insert("rmdir", rmdir::handle_argv);
        map.insert("ls", ls::handle_argv);
        map.insert("cat", cat::handle_argv);
        map.insert("cd", cd::handle_argv);
        map.insert("pwd", pwd::handle_argv);
        map.insert("info", info::handle_argv);
        map.insert("incp", incp::handle_argv);
        map.insert("outcp", outcp::handle_argv);
        map.insert("cp", cp::handle_argv);
        map.insert("mv", mv::handle_argv);
        map.insert("rm", rm::handle_argv);
        map.insert("ln", ln::handle_argv);
        map.insert("slink", slink::handle_argv);
        map.insert("statfs", statfs::handle_argv);
        map.insert("load", load::handle_argv);
        map.insert("clear", clear::handle_argv);
        map.insert("exit", exit::handle_argv);

        Self { map }
    }

    pub fn dispatch(&self, name: &str, argv: &[&str], context: &mut Context) {
        let Some(handler) = self.map.get(name) else {
            eprintln!("{} {name}", "Unknown command:".red());
            return;
        };
        if let Err(e) = handler(argv, context) {
            log::debug!("{name}: {e:#}");
            eprintln!("{}", status_line(&e).red());
        }
    }
}

/// Short status printed for a failed command.
pub fn status_line(err: &anyhow::Error) -> String {
    let Some(fs_err) = err.downcast_ref::<FsError>() else {
        return err.to_string();
    };
    match fs_err {
        FsError::NotFound => "FILE NOT FOUND".into(),
        FsError::NotDirectory => "PATH NOT FOUND".into(),
        FsError::NameExists => "EXIST".into(),
        FsError::NotEmpty => "NOT EMPTY".into(),
        FsError::NoSpace => "NO SPACE".into(),
        FsError::OutOfRange(_) => "FILE TOO LARGE".into(),
        FsError::NameTooLong => "NAME TOO LONG".into(),
        FsError::IsDirectory => "IS A DIRECTORY".into(),
        FsError::ReadOnly => "READ ONLY".into(),
        other => other.to_string().to_uppercase(),
    }
}

pub mod cat;
pub mod cd;
pub mod clear;
pub mod cp;
pub mod exit;
pub mod format;
pub mod incp;
pub mod info;
pub mod ln;
pub mod load;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod outcp;
pub mod pwd;
pub mod rm;
pub mod rmdir;
pub mod slink;
pub mod statfs;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_status_lines() {
        assert_eq!(status_line(&FsError::NotFound.into()), "FILE NOT FOUND");
        assert_eq!(status_line(&FsError::NameExists.into()), "EXIST");
        assert_eq!(status_line(&FsError::NotEmpty.into()), "NOT EMPTY");
        assert_eq!(status_line(&anyhow::anyhow!("usage: cd <path>")), "usage: cd <path>");
    }

    #[test]
    fn every_command_is_registered() {
        let registry = Registry::new();
        for name in ["format", "ls", "mv", "ln", "slink", "statfs", "exit"] {
            assert!(registry.map.contains_key(name), "{name} missing");
        }
    }
}
