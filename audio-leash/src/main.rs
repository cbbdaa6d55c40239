#![cfg_attr(windows, windows_subsystem = "windows")]

use audio_leash::{config, logging};

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    logging::init(config::settings_dir().as_deref());

    let result = audio_leash::app::run();
    if let Err(e) = &result {
        tracing::error!("AudioLeash exited with error: {e:#}");
    }
    result
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    logging::init(None);
    anyhow::bail!("{} only runs on Windows", config::APP_NAME)
}
