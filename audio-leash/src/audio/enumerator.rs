//! Device enumeration using Windows MMDevice API.
//!
//! Provides COM initialization and playback device enumeration.

use super::device::{AudioError, DeviceRole, PlaybackDevice};
use crate::bridge::DeviceSource;
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eCommunications, eConsole, eMultimedia, eRender, ERole, IMMDevice, IMMDeviceEnumerator,
    MMDeviceEnumerator, DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_APARTMENTTHREADED, STGM,
};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM as a single-threaded apartment for the current thread.
    ///
    /// The owner thread must be an STA: the policy interface used for
    /// switching is only callable from the apartment that created it.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(|e| AudioError::ComInitFailed { code: e.code().0 })?;
        }
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

pub(crate) fn to_erole(role: DeviceRole) -> ERole {
    match role {
        DeviceRole::Console => eConsole,
        DeviceRole::Multimedia => eMultimedia,
        DeviceRole::Communications => eCommunications,
    }
}

/// Device enumerator using Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new DeviceEnumerator.
    ///
    /// Note: COM must be initialized on the calling thread.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| AudioError::EnumerationFailed { code: e.code().0 })?;

            Ok(Self { enumerator })
        }
    }

    /// Get all active playback devices.
    pub fn get_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .map_err(|e| AudioError::EnumerationFailed { code: e.code().0 })?;

            let count = collection
                .GetCount()
                .map_err(|e| AudioError::EnumerationFailed { code: e.code().0 })?;

            let mut devices = Vec::with_capacity(count as usize);

            for i in 0..count {
                let device = collection
                    .Item(i)
                    .map_err(|e| AudioError::EnumerationFailed { code: e.code().0 })?;

                if let Ok(playback) = self.to_playback_device(&device) {
                    devices.push(playback);
                }
            }

            Ok(devices)
        }
    }

    /// Get the default playback device ID for a specific role.
    pub fn get_default_device_id(&self, role: DeviceRole) -> Result<Option<String>, AudioError> {
        unsafe {
            let device = match self
                .enumerator
                .GetDefaultAudioEndpoint(eRender, to_erole(role))
            {
                Ok(d) => d,
                Err(_) => return Ok(None),
            };

            Ok(Some(Self::device_id(&device)?))
        }
    }

    fn device_id(device: &IMMDevice) -> Result<String, AudioError> {
        unsafe {
            let id = device
                .GetId()
                .map_err(|e| AudioError::EnumerationFailed { code: e.code().0 })?;
            let id_string = id
                .to_string()
                .map_err(|e| AudioError::StringConversion(e.to_string()));
            windows::Win32::System::Com::CoTaskMemFree(Some(id.0 as *const _));
            id_string
        }
    }

    /// Convert an IMMDevice to a PlaybackDevice.
    fn to_playback_device(&self, device: &IMMDevice) -> Result<PlaybackDevice, AudioError> {
        unsafe {
            let id = Self::device_id(device)?;

            let props: IPropertyStore = device
                .OpenPropertyStore(STGM(0))
                .map_err(|e| AudioError::EnumerationFailed { code: e.code().0 })?;

            let name = self
                .get_device_name(&props)
                .unwrap_or_else(|| "Unknown".to_string());

            Ok(PlaybackDevice { id, name })
        }
    }

    /// Get the friendly name of a device from its property store.
    fn get_device_name(&self, props: &IPropertyStore) -> Option<String> {
        unsafe {
            // Convert DEVPROPKEY to PROPERTYKEY
            let key = PROPERTYKEY {
                fmtid: DEVPKEY_Device_FriendlyName.fmtid,
                pid: DEVPKEY_Device_FriendlyName.pid,
            };

            let prop = props.GetValue(&key).ok()?;

            let s = prop.to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
    }
}

/// [`DeviceSource`] over one long-lived enumerator.
///
/// Queries also run inside `IMMNotificationClient` callbacks, which must never
/// release the last reference to an MMDevice object. The enumerator is created
/// once on the owner thread and released there at exit.
#[derive(Clone)]
pub struct WindowsDeviceSource {
    enumerator: IMMDeviceEnumerator,
}

// SAFETY: MMDeviceEnumerator is registered free-threaded (ThreadingModel
// "Both"), so the interface may be called from any apartment.
unsafe impl Send for WindowsDeviceSource {}
unsafe impl Sync for WindowsDeviceSource {}

impl WindowsDeviceSource {
    /// Create the shared enumerator. COM must be initialized on this thread.
    pub fn new() -> Result<Self, AudioError> {
        let DeviceEnumerator { enumerator } = DeviceEnumerator::new()?;
        Ok(Self { enumerator })
    }

    /// The enumerator, also used for notification registration.
    pub fn raw_enumerator(&self) -> &IMMDeviceEnumerator {
        &self.enumerator
    }

    fn borrowed(&self) -> DeviceEnumerator {
        DeviceEnumerator {
            enumerator: self.enumerator.clone(),
        }
    }
}

impl DeviceSource for WindowsDeviceSource {
    fn active_playback_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError> {
        self.borrowed().get_devices()
    }

    fn default_playback_device_id(&self) -> Result<Option<String>, AudioError> {
        self.borrowed().get_default_device_id(DeviceRole::Multimedia)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::core::Interface;

    #[test]
    fn queries_reuse_the_shared_enumerator() {
        let _com = ComGuard::new().unwrap();
        let source = WindowsDeviceSource::new().unwrap();
        let shared = source.clone();
        let raw = source.raw_enumerator().as_raw();

        // No audio hardware on some hosts; only the enumerator identity matters
        let _ = shared.active_playback_devices();
        let _ = shared.default_playback_device_id();

        assert_eq!(shared.raw_enumerator().as_raw(), raw);
        assert_eq!(source.raw_enumerator().as_raw(), raw);
    }
}
