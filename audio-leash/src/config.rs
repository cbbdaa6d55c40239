//! Application constants.
//!
//! Names, file locations and defaults are collected here so they can be found
//! and adjusted in one place.

use std::path::PathBuf;

/// Display name used for the window title, tooltip and notices.
pub const APP_NAME: &str = "AudioLeash";

/// Directory under `%APPDATA%` holding settings and logs.
pub const SETTINGS_DIR_NAME: &str = "AudioLeash";

/// Settings file inside [`SETTINGS_DIR_NAME`].
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Log file inside [`SETTINGS_DIR_NAME`].
pub const LOG_FILE_NAME: &str = "audioleash.log";

/// Value name under the `Run` key for "Start with Windows".
pub const RUN_VALUE_NAME: &str = "AudioLeash";

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "audio_leash=info";

/// Maximum tooltip length accepted by the Shell, terminator included.
pub const TOOLTIP_MAX_UNITS: usize = 128;

/// `%APPDATA%\AudioLeash`, if `APPDATA` is set.
pub fn settings_dir() -> Option<PathBuf> {
    std::env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join(SETTINGS_DIR_NAME))
}

/// Tooltip text for the tray icon.
pub fn tooltip_for(selected_name: Option<&str>) -> String {
    let text = match selected_name {
        Some(name) => format!("{APP_NAME} - {name}"),
        None => format!("{APP_NAME} - not pinned"),
    };
    truncate_utf16(&text, TOOLTIP_MAX_UNITS - 1)
}

fn truncate_utf16(text: &str, max_units: usize) -> String {
    let mut units = 0;
    let mut out = String::new();
    for ch in text.chars() {
        units += ch.len_utf16();
        if units > max_units {
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_names_pinned_device() {
        assert_eq!(tooltip_for(Some("Speakers")), "AudioLeash - Speakers");
        assert_eq!(tooltip_for(None), "AudioLeash - not pinned");
    }

    #[test]
    fn tooltip_fits_shell_buffer() {
        let long = "x".repeat(500);
        let tip = tooltip_for(Some(&long));
        assert_eq!(tip.encode_utf16().count(), TOOLTIP_MAX_UNITS - 1);
    }

    #[test]
    fn truncation_never_splits_a_surrogate_pair() {
        let text = "ab\u{1F50A}";
        assert_eq!(truncate_utf16(text, 3), "ab");
        assert_eq!(truncate_utf16(text, 4), text);
    }
}
