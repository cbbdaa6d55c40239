//! "Start with Windows" registration.
//!
//! Manages the value under the per-user `Run` key that launches AudioLeash at
//! sign-in.

use crate::config::RUN_VALUE_NAME;
use thiserror::Error;
use windows::core::PCWSTR;
use windows::Win32::System::Registry::{
    RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
    HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_SZ,
};

/// Registry error types.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to access registry: {0}")]
    RegistryAccess(String),

    #[error("Failed to write registry value: {key}")]
    WriteFailed { key: String },
}

/// Run-key registration for the current executable.
pub struct StartupRegistration {
    run_key_path: Vec<u16>,
    value_name: Vec<u16>,
}

impl StartupRegistration {
    const RUN_KEY: &'static str = r"Software\Microsoft\Windows\CurrentVersion\Run";

    /// Create a new StartupRegistration instance.
    pub fn new() -> Self {
        Self {
            run_key_path: Self::to_wide(Self::RUN_KEY),
            value_name: Self::to_wide(RUN_VALUE_NAME),
        }
    }

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Check if "Start with Windows" is enabled.
    pub fn is_enabled(&self) -> bool {
        unsafe {
            let mut hkey = HKEY::default();
            let result = RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.run_key_path.as_ptr()),
                0,
                KEY_READ,
                &mut hkey,
            );

            if result.is_err() {
                return false;
            }

            let mut data_size = 0u32;
            let result = RegQueryValueExW(
                hkey,
                PCWSTR::from_raw(self.value_name.as_ptr()),
                None,
                None,
                None,
                Some(&mut data_size),
            );

            let _ = RegCloseKey(hkey);

            result.is_ok() && data_size > 0
        }
    }

    /// Enable or disable "Start with Windows".
    pub fn set_enabled(&self, enabled: bool) -> Result<(), RegistryError> {
        unsafe {
            let mut hkey = HKEY::default();
            let result = RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.run_key_path.as_ptr()),
                0,
                KEY_WRITE,
                &mut hkey,
            );

            if result.is_err() {
                return Err(RegistryError::RegistryAccess(
                    "Failed to open Run key".to_string(),
                ));
            }

            let result = if enabled {
                let exe_path = match std::env::current_exe() {
                    Ok(path) => path,
                    Err(_) => {
                        let _ = RegCloseKey(hkey);
                        return Err(RegistryError::WriteFailed {
                            key: RUN_VALUE_NAME.to_string(),
                        });
                    }
                };
                // Quoted so paths with spaces survive the Run key parser
                let command = format!("\"{}\"", exe_path.to_string_lossy());
                let command_wide = Self::to_wide(&command);

                RegSetValueExW(
                    hkey,
                    PCWSTR::from_raw(self.value_name.as_ptr()),
                    0,
                    REG_SZ,
                    Some(std::slice::from_raw_parts(
                        command_wide.as_ptr() as *const u8,
                        command_wide.len() * 2,
                    )),
                )
            } else {
                RegDeleteValueW(hkey, PCWSTR::from_raw(self.value_name.as_ptr()))
            };

            let _ = RegCloseKey(hkey);

            if result.is_err() && enabled {
                Err(RegistryError::WriteFailed {
                    key: RUN_VALUE_NAME.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    /// Flip the registration. Returns the new state.
    pub fn toggle(&self) -> Result<bool, RegistryError> {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled)?;
        Ok(enabled)
    }
}

impl Default for StartupRegistration {
    fn default() -> Self {
        Self::new()
    }
}
