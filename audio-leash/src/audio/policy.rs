//! Default endpoint switching through the undocumented `IPolicyConfig`
//! interface used by the Sound control panel.

use super::device::{set_for_roles, AudioError};
use crate::bridge::EndpointSwitch;
use windows::core::*;
use windows::Win32::System::Com::*;

/// IPolicyConfig COM interface (undocumented but stable)
/// Used to set the default audio device
#[windows::core::interface("F8679F50-850A-41CF-9C72-430F290290C8")]
pub unsafe trait IPolicyConfig: IUnknown {
    // Reserved methods to maintain vtable order
    fn reserved1(&self) -> HRESULT;
    fn reserved2(&self) -> HRESULT;
    fn reserved3(&self) -> HRESULT;
    fn reserved4(&self) -> HRESULT;
    fn reserved5(&self) -> HRESULT;
    fn reserved6(&self) -> HRESULT;
    fn reserved7(&self) -> HRESULT;
    fn reserved8(&self) -> HRESULT;
    fn reserved9(&self) -> HRESULT;
    fn reserved10(&self) -> HRESULT;

    fn SetDefaultEndpoint(&self, device_id: PCWSTR, role: u32) -> HRESULT;
}

// PolicyConfigClient CLSID
const CLSID_POLICY_CONFIG_CLIENT: GUID = GUID::from_u128(0x870af99c_171d_4f9e_af0d_e63df40c2bc9);

fn create_policy_config() -> Result<IPolicyConfig> {
    unsafe { CoCreateInstance(&CLSID_POLICY_CONFIG_CLIENT, None, CLSCTX_ALL) }
}

/// Sets the specified device as the default for Console, Multimedia and
/// Communications, in that order. Stops at the first failing role.
pub fn set_default_device_for_all_roles(device_id: &str) -> std::result::Result<(), AudioError> {
    let policy_config = create_policy_config().map_err(|e| AudioError::PlatformUnavailable {
        reason: e.message().to_string(),
    })?;

    let device_id_wide: Vec<u16> = device_id.encode_utf16().chain(std::iter::once(0)).collect();

    set_for_roles(|role| {
        let hr = unsafe {
            policy_config.SetDefaultEndpoint(PCWSTR(device_id_wide.as_ptr()), role as u32)
        };
        if hr.is_err() {
            Err(hr.0)
        } else {
            Ok(())
        }
    })
}

/// [`EndpointSwitch`] backed by `IPolicyConfig`.
///
/// A policy object is created per switch on the calling thread, which must be
/// the owner STA.
#[derive(Debug, Clone, Copy)]
pub struct PolicyConfigSwitcher {
    _probed: (),
}

impl PolicyConfigSwitcher {
    /// Check once that the policy interface can be obtained at all.
    pub fn new() -> std::result::Result<Self, AudioError> {
        create_policy_config().map_err(|e| AudioError::PlatformUnavailable {
            reason: e.message().to_string(),
        })?;
        Ok(Self { _probed: () })
    }
}

impl EndpointSwitch for PolicyConfigSwitcher {
    fn set_default_for_all_roles(&self, device_id: &str) -> std::result::Result<(), AudioError> {
        set_default_device_for_all_roles(device_id)
    }
}
