//! Audio device data models.
//!
//! Platform-neutral types shared by the selection logic, the notification
//! bridge and the Windows Core Audio bindings.

use thiserror::Error;

/// An active playback endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackDevice {
    /// Unique Windows device ID (opaque string from IMMDevice::GetId)
    pub id: String,

    /// Human-readable device name (from device properties)
    pub name: String,
}

impl PlaybackDevice {
    /// Create a new PlaybackDevice.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Direction of an audio endpoint (maps to Windows EDataFlow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DataFlow {
    /// Playback
    Render = 0,

    /// Recording
    Capture = 1,

    /// Both directions; only used as a query wildcard
    All = 2,
}

/// Audio device role (maps to Windows ERole enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceRole {
    /// Used by games, system sounds, most general applications
    Console = 0,

    /// Used by music players, video players
    Multimedia = 1,

    /// Used by Teams, Zoom, Discord, and other VoIP applications
    Communications = 2,
}

impl DeviceRole {
    /// Roles in the order the Sound control panel sets them.
    pub const ALL: [DeviceRole; 3] = [
        DeviceRole::Console,
        DeviceRole::Multimedia,
        DeviceRole::Communications,
    ];
}

/// Apply `set` to every role in [`DeviceRole::ALL`] order.
///
/// `set` returns the failing HRESULT; the first failure is reported and the
/// remaining roles are not attempted.
pub fn set_for_roles<F>(mut set: F) -> Result<(), AudioError>
where
    F: FnMut(DeviceRole) -> Result<(), i32>,
{
    for role in DeviceRole::ALL {
        set(role).map_err(|code| AudioError::SwitchFailed { role, code })?;
    }
    Ok(())
}

/// Audio service error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("Audio policy interface unavailable: {reason}")]
    PlatformUnavailable { reason: String },

    #[error("COM initialization failed (HRESULT {code:#010x})")]
    ComInitFailed { code: i32 },

    #[error("Failed to enumerate devices (HRESULT {code:#010x})")]
    EnumerationFailed { code: i32 },

    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    #[error("Failed to set default device for {role:?} role (HRESULT {code:#010x})")]
    SwitchFailed { role: DeviceRole, code: i32 },

    #[error("String conversion error: {0}")]
    StringConversion(String),
}

/// Failure of the cross-thread hop onto the owner thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Owner window no longer exists")]
    OwnerGone,

    #[error("Dispatched action panicked")]
    ActionPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_failed_renders_hresult_as_hex() {
        let err = AudioError::SwitchFailed {
            role: DeviceRole::Multimedia,
            code: 0x8889_0008_u32 as i32,
        };
        assert_eq!(
            err.to_string(),
            "Failed to set default device for Multimedia role (HRESULT 0x88890008)"
        );
    }

    #[test]
    fn roles_are_ordered_console_multimedia_communications() {
        let raw: Vec<u32> = DeviceRole::ALL.iter().map(|r| *r as u32).collect();
        assert_eq!(raw, vec![0, 1, 2]);
    }

    #[test]
    fn every_role_is_set_in_order() {
        let mut calls = Vec::new();
        let result = set_for_roles(|role| {
            calls.push(role);
            Ok(())
        });

        assert_eq!(result, Ok(()));
        assert_eq!(
            calls,
            vec![
                DeviceRole::Console,
                DeviceRole::Multimedia,
                DeviceRole::Communications,
            ]
        );
    }

    #[test]
    fn first_failing_role_stops_the_rest() {
        const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;
        let mut calls = Vec::new();
        let result = set_for_roles(|role| {
            calls.push(role);
            match role {
                DeviceRole::Multimedia => Err(E_ACCESSDENIED),
                _ => Ok(()),
            }
        });

        assert_eq!(
            result,
            Err(AudioError::SwitchFailed {
                role: DeviceRole::Multimedia,
                code: E_ACCESSDENIED,
            })
        );
        assert_eq!(calls, vec![DeviceRole::Console, DeviceRole::Multimedia]);
    }

    #[test]
    fn failure_on_console_attempts_nothing_else() {
        let mut calls = 0;
        let result = set_for_roles(|_| {
            calls += 1;
            Err(-1)
        });

        assert!(matches!(
            result,
            Err(AudioError::SwitchFailed { role: DeviceRole::Console, code: -1 })
        ));
        assert_eq!(calls, 1);
    }
}
