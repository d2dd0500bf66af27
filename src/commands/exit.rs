use super::Context;
use crate::utils::exit_codes::ExitCode;

/// `exit`: unmounts the image and leaves the shell.
pub fn handle_argv(_argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    context.close_fs()?;
    std::process::exit(ExitCode::Success.into())
}
