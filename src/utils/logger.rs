use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Prints log records to stderr with a coloured level tag.
struct ShellLogger {
    level: LevelFilter,
}

impl Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("[{tag}] {}", record.args());
    }

    fn flush(&self) {}
}

pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let logger = Box::leak(Box::new(ShellLogger { level }));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}
