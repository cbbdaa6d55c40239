//! AudioLeash - Library
//!
//! A system tray utility that keeps the Windows default playback device
//! pinned to the one the user chose.
//!
//! ## Features
//!
//! - Pin any active playback device from the tray menu
//! - Switch back automatically when something else changes the default
//! - Forget the pin when the device is unplugged or disabled
//! - Remember the pin across restarts
//! - Start with Windows option
//!
//! The selection logic ([`selection`]) and the notification bridge
//! ([`bridge`]) are platform-neutral; the Core Audio bindings, tray and
//! owner window only build on Windows.

pub mod audio;
pub mod bridge;
pub mod config;
pub mod logging;
pub mod selection;
pub mod settings;

#[cfg(windows)]
pub mod app;
#[cfg(windows)]
pub mod platform;
#[cfg(windows)]
pub mod ui;

pub use audio::{AudioError, DataFlow, DeviceRole, DispatchError, PlaybackDevice};
pub use bridge::{
    Collaborators, DeviceBridge, DeviceSource, EndpointSwitch, OwnerThread, SelectionStore,
    Severity, UserFeedback,
};
pub use selection::{InternalChangeGuard, RestoreDecision, SelectionSnapshot, SelectionState};
pub use settings::{JsonSelectionStore, Settings, SettingsError};
