use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::commands::{Context, Registry};

pub fn write_greet() {
    println!(
        "{} - {}",
        "mzfs shell".green(),
        env!("CARGO_PKG_VERSION").yellow()
    );
}

fn write_prefix(context: &Context) {
    let marker = if context.fs.is_some() { ">" } else { "(unformatted) >" };
    eprint!("{} ", marker.cyan());
    let _ = io::stderr().flush();
}

/// Reads commands until `exit` or end of input.
pub fn handle_app_loop(context: &mut Context) {
    let stdin = io::stdin();
    let registry = Registry::new();

    write_greet();
    loop {
        write_prefix(context);
        let mut user_input = String::new();
        match stdin.lock().read_line(&mut user_input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::error!("cannot read input: {e}");
                break;
            }
        }

        let mut it = user_input.split_whitespace();
        let Some(command) = it.next() else {
            continue;
        };
        let args: Vec<&str> = it.collect();

        registry.dispatch(command, &args, context);
    }
}
