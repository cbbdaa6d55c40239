//! Tracing subscriber setup.

use crate::config::{DEFAULT_LOG_FILTER, LOG_FILE_NAME};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

/// Install the global subscriber.
///
/// The release binary has no console, so logs are appended to
/// `<dir>/audioleash.log`. Without a directory, or if the file cannot be
/// opened, logs go to stderr.
pub fn init(dir: Option<&Path>) {
    let file = dir.and_then(|dir| {
        fs::create_dir_all(dir).ok()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE_NAME))
            .ok()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let result = match file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logging already initialised: {e}");
    }
}
