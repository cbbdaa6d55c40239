use crate::audio::PlaybackDevice;
use windows::core::*;
use windows::Win32::Foundation::*;
use windows::Win32::UI::WindowsAndMessaging::*;

// Menu command IDs
pub const CMD_EXIT: u32 = 1;
pub const CMD_CLEAR_SELECTION: u32 = 2;
pub const CMD_TOGGLE_STARTUP: u32 = 3;
pub const CMD_DEVICE_BASE: u32 = 100; // Devices start at 100

/// What the context menu shows.
pub struct MenuModel<'a> {
    pub devices: &'a [PlaybackDevice],
    pub selected_id: Option<&'a str>,
    pub default_id: Option<&'a str>,
    pub is_startup: bool,
}

/// Label for a device entry.
fn device_label(device: &PlaybackDevice, is_default: bool) -> String {
    if is_default {
        format!("{} (default)", device.name)
    } else {
        device.name.clone()
    }
}

/// Show the context menu at the specified position and wait for a choice.
///
/// Returns the chosen command, or 0 if the menu was dismissed. Device entries
/// use `CMD_DEVICE_BASE + index` into `model.devices`.
pub fn show_context_menu(hwnd: HWND, x: i32, y: i32, model: &MenuModel<'_>) -> Result<u32> {
    unsafe {
        let menu = CreatePopupMenu()?;

        for (i, device) in model.devices.iter().enumerate() {
            let label = device_label(device, model.default_id == Some(device.id.as_str()));
            let label_wide: Vec<u16> = label.encode_utf16().chain(std::iter::once(0)).collect();
            let flags = if model.selected_id == Some(device.id.as_str()) {
                MF_STRING | MF_CHECKED
            } else {
                MF_STRING
            };

            let _ = AppendMenuW(menu, flags, (CMD_DEVICE_BASE + i as u32) as usize, PCWSTR(label_wide.as_ptr()));
        }

        if model.devices.is_empty() {
            let _ = AppendMenuW(menu, MF_STRING | MF_GRAYED, 0, w!("No playback devices"));
        }

        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, None);

        let clear_flags = if model.selected_id.is_some() {
            MF_STRING
        } else {
            MF_STRING | MF_GRAYED
        };
        let _ = AppendMenuW(menu, clear_flags, CMD_CLEAR_SELECTION as usize, w!("Clear selection"));

        let startup_flags = if model.is_startup {
            MF_STRING | MF_CHECKED
        } else {
            MF_STRING
        };
        let _ = AppendMenuW(menu, startup_flags, CMD_TOGGLE_STARTUP as usize, w!("Start with Windows"));

        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, None);

        let _ = AppendMenuW(menu, MF_STRING, CMD_EXIT as usize, w!("Exit"));

        // Foreground first, or the menu will not close on an outside click
        let _ = SetForegroundWindow(hwnd);
        let chosen = TrackPopupMenu(
            menu,
            TPM_RIGHTBUTTON | TPM_RETURNCMD | TPM_NONOTIFY,
            x,
            y,
            0,
            hwnd,
            None,
        );
        let _ = PostMessageW(hwnd, WM_NULL, WPARAM(0), LPARAM(0));

        let _ = DestroyMenu(menu);

        Ok(chosen.0 as u32)
    }
}
