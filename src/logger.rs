//! logger
//!
//! `env_logger` backend for the CLI.
//!
//! Records are written to stderr as `[level] message`. The filter comes from
//! `RUST_LOG` (default `info`) and accepts the usual `env_logger`
//! directives. `--debug` is only known after arguments are parsed, so
//! [`enable_debug`] switches to a second logger that passes everything at
//! `debug` and above.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use env_logger::{Builder, Env, Logger};
use log::{LevelFilter, Log, Metadata, Record};

static DEBUG: AtomicBool = AtomicBool::new(false);

struct CliLogger {
    env: Logger,
    debug: Logger,
}

impl CliLogger {
    fn active(&self) -> &Logger {
        if DEBUG.load(Ordering::Relaxed) {
            &self.debug
        } else {
            &self.env
        }
    }
}

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.env.enabled(metadata) || (DEBUG.load(Ordering::Relaxed) && self.debug.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        if self.env.matches(record) {
            self.env.log(record);
        } else {
            self.active().log(record);
        }
    }

    fn flush(&self) {
        self.active().flush();
    }
}

fn builder() -> Builder {
    let mut builder = Builder::new();
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}",
            record.level().as_str().to_lowercase(),
            record.args()
        )
    });
    builder
}

/// `RUST_LOG` filter, falling back to `info` when unset.
fn env_filter() -> Env<'static> {
    Env::default().filter_or("RUST_LOG", "info")
}

/// Initialize the global logger.
///
/// Calling this more than once is harmless: later calls are ignored.
pub fn init() {
    let mut env = builder();
    env.parse_env(env_filter());
    let env = env.build();

    let mut debug = builder();
    debug.parse_env(env_filter());
    debug.filter_level(LevelFilter::Debug);
    let debug = debug.build();

    let filter = env.filter();
    if log::set_boxed_logger(Box::new(CliLogger { env, debug })).is_ok() {
        log::set_max_level(filter);
    }
}

/// Let `debug` records through unless the filter is already more verbose.
pub fn enable_debug() {
    DEBUG.store(true, Ordering::Relaxed);
    if log::max_level() < LevelFilter::Debug {
        log::set_max_level(LevelFilter::Debug);
    }
}
