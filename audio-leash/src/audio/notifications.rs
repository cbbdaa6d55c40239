//! Default-device notifications using IMMNotificationClient.
//!
//! Windows calls the client on a worker thread of its own. The client hands
//! default-device changes straight to the [`DeviceBridge`], which decides and
//! marshals any side effects to the owner thread.

use super::device::{AudioError, DataFlow, DeviceRole};
use crate::bridge::DeviceBridge;
use std::sync::Arc;
use tracing::debug;
use windows::core::{implement, PCWSTR};
use windows::Win32::Media::Audio::{
    eCapture, eCommunications, eConsole, eRender, EDataFlow, ERole, IMMDeviceEnumerator,
    IMMNotificationClient, IMMNotificationClient_Impl, DEVICE_STATE,
};
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;
// Re-export windows_core so the implement macro can find it
#[allow(unused_imports)]
use windows_core;

/// Notification client that forwards default-device changes to the bridge.
#[implement(IMMNotificationClient)]
pub struct DeviceNotificationClient {
    bridge: Arc<DeviceBridge>,
}

impl DeviceNotificationClient {
    /// Create a new notification client.
    pub fn new(bridge: Arc<DeviceBridge>) -> Self {
        Self { bridge }
    }

    fn convert_flow(flow: EDataFlow) -> DataFlow {
        if flow == eRender {
            DataFlow::Render
        } else if flow == eCapture {
            DataFlow::Capture
        } else {
            DataFlow::All
        }
    }

    fn convert_role(role: ERole) -> DeviceRole {
        if role == eConsole {
            DeviceRole::Console
        } else if role == eCommunications {
            DeviceRole::Communications
        } else {
            DeviceRole::Multimedia
        }
    }
}

impl IMMNotificationClient_Impl for DeviceNotificationClient_Impl {
    fn OnDeviceStateChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnDeviceAdded(&self, _pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnDeviceRemoved(&self, _pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        let device_id = if pwstrdefaultdeviceid.is_null() {
            None
        } else {
            unsafe { pwstrdefaultdeviceid.to_string().ok() }
        };

        self.bridge.on_default_device_changed(
            DeviceNotificationClient::convert_flow(flow),
            DeviceNotificationClient::convert_role(role),
            device_id.as_deref(),
        );
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _key: &PROPERTYKEY,
    ) -> windows::core::Result<()> {
        Ok(())
    }
}

/// Registration of a [`DeviceNotificationClient`].
///
/// Owns the COM object Windows holds a pointer to, so the client lives
/// exactly as long as the registration. Dropping unregisters.
pub struct EndpointSubscription {
    enumerator: IMMDeviceEnumerator,
    client: IMMNotificationClient,
}

impl EndpointSubscription {
    /// Register `client` with `enumerator`.
    pub fn register(
        enumerator: &IMMDeviceEnumerator,
        client: DeviceNotificationClient,
    ) -> Result<Self, AudioError> {
        let client: IMMNotificationClient = client.into();
        unsafe {
            enumerator
                .RegisterEndpointNotificationCallback(&client)
                .map_err(|e| AudioError::EnumerationFailed { code: e.code().0 })?;
        }
        debug!("Registered endpoint notification callback");
        Ok(Self {
            enumerator: enumerator.clone(),
            client,
        })
    }
}

impl Drop for EndpointSubscription {
    fn drop(&mut self) {
        unsafe {
            let _ = self
                .enumerator
                .UnregisterEndpointNotificationCallback(&self.client);
        }
        debug!("Unregistered endpoint notification callback");
    }
}
