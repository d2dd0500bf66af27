mod commands;
mod context;
mod utils;

use commands::Context;
use utils::{arg_man, file_man, logger, tui};

fn main() -> anyhow::Result<()> {
    let args = arg_man::handle_prog_args();
    logger::init(args.verbose);

    let mut context = Context::new();
    file_man::handle_fs(&args.image, &mut context);
    tui::handle_app_loop(&mut context);
    context.close_fs()
}
