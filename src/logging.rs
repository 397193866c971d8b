use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging: console output on stderr plus an optional JSON file log.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: &str, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flp_confgen={level}")));

    // Generated artifacts may go to stdout; keep logs on stderr
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("cannot create log directory {}: {}", dir.display(), e);
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(dir, "confgen.log");
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
        // Leaked so the writer thread outlives the subscriber; lines still buffered at exit are lost
        std::mem::forget(guard);
        Some(fmt::layer().json().with_writer(non_blocking_writer))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();
}
