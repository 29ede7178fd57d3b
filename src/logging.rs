//! Logging setup for pipeline runs
//!
//! Components log through the `log` facade with their module path as the
//! target; this wires up `env_logger` to print those records, optionally
//! copying them into a log file.

use eyre::{Context, Result};
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Environment variable that overrides the configured level
pub const LEVEL_ENV: &str = "LOG_LEVEL";

/// Initialize the global logger
///
/// Records are written as `timestamp | LEVEL | target | message` to stderr
/// and, when `log_file` is given, appended to that file as well (its parent
/// directory is created if needed). `LOG_LEVEL` in the environment takes
/// precedence over `level`.
///
/// # Errors
/// Returns an error if the log file cannot be opened or a logger is already
/// installed
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let env = env_logger::Env::default().filter_or(LEVEL_ENV, level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} | {:<5} | {} | {}",
            buf.timestamp_millis(),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = open_log_file(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee {
            console: io::stderr(),
            file,
        })));
    }

    builder.try_init().context("Logger already initialized")?;
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Writes every record to stderr and the log file, unbuffered
struct Tee {
    console: io::Stderr,
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.console.flush()?;
        self.file.flush()
    }
}
