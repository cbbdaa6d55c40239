//! Audio module for Windows Core Audio API interactions.
//!
//! This module provides playback device enumeration, default endpoint
//! switching, and default-device notifications. The data types in
//! [`device`] are platform-neutral; everything else needs Windows.

pub mod device;
#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod notifications;
#[cfg(windows)]
pub mod policy;

pub use device::{AudioError, DataFlow, DeviceRole, DispatchError, PlaybackDevice};
#[cfg(windows)]
pub use enumerator::{ComGuard, DeviceEnumerator, WindowsDeviceSource};
#[cfg(windows)]
pub use notifications::{DeviceNotificationClient, EndpointSubscription};
#[cfg(windows)]
pub use policy::PolicyConfigSwitcher;
