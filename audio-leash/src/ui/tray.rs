//! Notification-area icon.
//!
//! Shows whether a device is pinned, carries the tooltip, and raises balloon
//! notices for restores and failures.

use crate::audio::PlaybackDevice;
use crate::bridge::{Severity, UserFeedback};
use crate::config::tooltip_for;
use crate::platform::window::WM_TRAY_ICON;
use std::ffi::c_void;
use windows::core::*;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::UI::Shell::*;
use windows::Win32::UI::WindowsAndMessaging::*;

const TRAY_ICON_ID: u32 = 1;

/// Copy `text` into a fixed UTF-16 buffer, truncating and terminating.
fn copy_wide(dst: &mut [u16], text: &str) {
    let max = dst.len().saturating_sub(1);
    let mut len = 0;
    for (slot, unit) in dst.iter_mut().zip(text.encode_utf16().take(max)) {
        *slot = unit;
        len += 1;
    }
    if let Some(terminator) = dst.get_mut(len) {
        *terminator = 0;
    }
}

/// Manages the system tray icon
pub struct TrayIcon {
    hwnd: isize,
    icon_pinned: isize,
    icon_unpinned: isize,
}

impl TrayIcon {
    pub fn new(hwnd: HWND, selected: Option<&PlaybackDevice>) -> Result<Self> {
        // Try to create custom icons, fall back to system icons
        let (icon_pinned, icon_unpinned) = match (create_speaker_icon(true), create_speaker_icon(false)) {
            (Ok(pinned), Ok(unpinned)) => (pinned, unpinned),
            _ => unsafe {
                let pinned = LoadIconW(None, IDI_APPLICATION)?;
                let unpinned = LoadIconW(None, IDI_INFORMATION)?;
                (pinned, unpinned)
            },
        };

        let tray = Self {
            hwnd: hwnd.0 as isize,
            icon_pinned: icon_pinned.0 as isize,
            icon_unpinned: icon_unpinned.0 as isize,
        };

        tray.add(selected)?;

        Ok(tray)
    }

    fn hwnd(&self) -> HWND {
        HWND(self.hwnd as *mut c_void)
    }

    fn icon(&self, pinned: bool) -> HICON {
        let raw = if pinned { self.icon_pinned } else { self.icon_unpinned };
        HICON(raw as *mut c_void)
    }

    fn base_data(&self) -> NOTIFYICONDATAW {
        NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.hwnd(),
            uID: TRAY_ICON_ID,
            ..Default::default()
        }
    }

    /// Add the icon. Also used after Explorer restarts.
    pub fn add(&self, selected: Option<&PlaybackDevice>) -> Result<()> {
        let mut nid = self.base_data();
        nid.uFlags = NIF_ICON | NIF_MESSAGE | NIF_TIP | NIF_SHOWTIP;
        nid.uCallbackMessage = WM_TRAY_ICON;
        nid.hIcon = self.icon(selected.is_some());
        copy_wide(&mut nid.szTip, &tooltip_for(selected.map(|d| d.name.as_str())));

        unsafe {
            if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
                let err = GetLastError();
                return Err(Error::new(HRESULT::from_win32(err.0), "Shell_NotifyIconW failed"));
            }

            // Set version for modern behavior
            nid.Anonymous.uVersion = NOTIFYICON_VERSION_4;
            let _ = Shell_NotifyIconW(NIM_SETVERSION, &nid);
        }

        Ok(())
    }

    /// Refresh icon and tooltip.
    pub fn update(&self, selected: Option<&PlaybackDevice>) {
        let mut nid = self.base_data();
        nid.uFlags = NIF_ICON | NIF_TIP | NIF_SHOWTIP;
        nid.hIcon = self.icon(selected.is_some());
        copy_wide(&mut nid.szTip, &tooltip_for(selected.map(|d| d.name.as_str())));

        unsafe {
            let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
        }
    }

    /// Show a balloon notice.
    pub fn show_balloon(&self, title: &str, body: &str, severity: Severity) {
        let mut nid = self.base_data();
        nid.uFlags = NIF_INFO;
        nid.dwInfoFlags = match severity {
            Severity::Info => NIIF_INFO,
            Severity::Warning => NIIF_WARNING,
            Severity::Error => NIIF_ERROR,
        };
        copy_wide(&mut nid.szInfoTitle, title);
        copy_wide(&mut nid.szInfo, body);

        unsafe {
            let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
        }
    }

    pub fn remove(&self) {
        let nid = self.base_data();

        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
        }
    }
}

impl UserFeedback for TrayIcon {
    fn notify(&self, title: &str, body: &str, severity: Severity) {
        self.show_balloon(title, body, severity);
    }

    fn selection_changed(&self, selected: Option<&PlaybackDevice>) {
        self.update(selected);
    }
}

/// Create a small speaker icon; white when pinned, grey when not.
fn create_speaker_icon(pinned: bool) -> Result<HICON> {
    unsafe {
        let size = 16i32;

        let screen_dc = GetDC(None);
        if screen_dc.is_invalid() {
            return Err(Error::from_win32());
        }

        let mem_dc = CreateCompatibleDC(screen_dc);
        if mem_dc.is_invalid() {
            ReleaseDC(None, screen_dc);
            return Err(Error::from_win32());
        }

        let bitmap = CreateCompatibleBitmap(screen_dc, size, size);
        if bitmap.is_invalid() {
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);
            return Err(Error::from_win32());
        }

        let old_bitmap = SelectObject(mem_dc, bitmap);

        let black_brush = GetStockObject(BLACK_BRUSH);
        let rect = RECT { left: 0, top: 0, right: size, bottom: size };
        FillRect(mem_dc, &rect, HBRUSH(black_brush.0));

        let color = if pinned { COLORREF(0x00FFFFFF) } else { COLORREF(0x00808080) };
        let pen = CreatePen(PS_SOLID, 1, color);
        let brush = CreateSolidBrush(color);
        let old_pen = SelectObject(mem_dc, pen);
        let old_brush = SelectObject(mem_dc, brush);

        // Speaker box and cone
        let _ = Rectangle(mem_dc, 1, 5, 5, 11);
        let cone = [
            POINT { x: 5, y: 5 },
            POINT { x: 9, y: 1 },
            POINT { x: 9, y: 15 },
            POINT { x: 5, y: 11 },
        ];
        let _ = Polygon(mem_dc, &cone);

        // Sound waves
        let _ = Arc(mem_dc, 7, 4, 13, 12, 11, 12, 11, 4);
        let _ = Arc(mem_dc, 7, 1, 16, 15, 13, 15, 13, 1);

        SelectObject(mem_dc, old_pen);
        SelectObject(mem_dc, old_brush);
        let _ = DeleteObject(pen);
        let _ = DeleteObject(brush);

        SelectObject(mem_dc, old_bitmap);

        let mask = CreateBitmap(size, size, 1, 1, None);
        if mask.is_invalid() {
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);
            return Err(Error::from_win32());
        }

        // All-zero mask: every pixel opaque
        let mask_dc = CreateCompatibleDC(screen_dc);
        let old_mask = SelectObject(mask_dc, mask);
        FillRect(mask_dc, &rect, HBRUSH(black_brush.0));
        SelectObject(mask_dc, old_mask);
        let _ = DeleteDC(mask_dc);

        let _ = DeleteDC(mem_dc);
        ReleaseDC(None, screen_dc);

        let icon_info = ICONINFO {
            fIcon: TRUE,
            xHotspot: 0,
            yHotspot: 0,
            hbmMask: mask,
            hbmColor: bitmap,
        };

        let icon = CreateIconIndirect(&icon_info)?;

        let _ = DeleteObject(bitmap);
        let _ = DeleteObject(mask);

        Ok(icon)
    }
}
