use std::path::PathBuf;
use std::{env, process};

use crate::utils::exit_codes::ExitCode;

pub struct ProgArgs {
    pub image: PathBuf,
    pub verbose: bool,
}

fn handle_help(code: ExitCode) -> ! {
    println!("Usage: mzfs [--help] [--verbose] <image>");
    process::exit(code.into());
}

pub fn handle_prog_args() -> ProgArgs {
    parse(env::args().skip(1)).unwrap_or_else(|code| handle_help(code))
}

fn parse(args: impl Iterator<Item = String>) -> Result<ProgArgs, ExitCode> {
    let mut image = None;
    let mut verbose = false;
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Err(ExitCode::Success),
            "--verbose" | "-v" => verbose = true,
            flag if flag.starts_with('-') => return Err(ExitCode::Error),
            _ if image.is_some() => return Err(ExitCode::Error),
            _ => image = Some(PathBuf::from(arg)),
        }
    }
    let image = image.ok_or(ExitCode::Error)?;
    Ok(ProgArgs { image, verbose })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn image_and_flags() {
        let parsed = parse(args(&["-v", "disk.img"])).unwrap();
        assert!(parsed.verbose);
        assert_eq!(parsed.image, PathBuf::from("disk.img"));
        assert!(parse(args(&[])).is_err());
        assert!(parse(args(&["a.img", "b.img"])).is_err());
        assert!(parse(args(&["--bogus", "a.img"])).is_err());
    }
}
