//! Hidden owner window.
//!
//! The window's thread is the UI thread and the COM apartment the policy
//! interface lives in. Other threads reach it with a synchronous
//! `SendMessageW`, so the caller blocks until the action has run.

use crate::audio::DispatchError;
use crate::bridge::OwnerThread;
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use windows::core::*;
use windows::Win32::Foundation::*;
use windows::Win32::UI::WindowsAndMessaging::*;

pub const WM_TRAY_ICON: u32 = WM_USER + 1;
pub const WM_RUN_ON_OWNER: u32 = WM_USER + 2;

const DISPATCH_DONE: isize = 1;
const DISPATCH_PANICKED: isize = 2;

/// Register the window class and create the hidden owner window.
pub fn create_owner_window(
    title: PCWSTR,
    window_proc: WNDPROC,
) -> Result<HWND> {
    unsafe {
        let instance = windows::Win32::System::LibraryLoader::GetModuleHandleW(None)?;

        let window_class = w!("AudioLeashWindow");
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: window_proc,
            hInstance: instance.into(),
            lpszClassName: window_class,
            ..Default::default()
        };

        if RegisterClassExW(&wc) == 0 {
            return Err(Error::from_win32());
        }

        // A top-level window, not message-only, so it receives the
        // TaskbarCreated broadcast.
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            window_class,
            title,
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            None,
            None,
            instance,
            None,
        )
    }
}

/// Handle [`WM_RUN_ON_OWNER`] inside the window procedure.
///
/// # Safety
/// `lparam` must come from [`OwnerWindow::run_on_owner_thread`].
pub unsafe fn run_dispatched(lparam: LPARAM) -> LRESULT {
    let action = &mut *(lparam.0 as *mut &mut dyn FnMut());
    match catch_unwind(AssertUnwindSafe(|| action())) {
        Ok(()) => LRESULT(DISPATCH_DONE),
        Err(_) => LRESULT(DISPATCH_PANICKED),
    }
}

/// [`OwnerThread`] backed by the hidden window.
pub struct OwnerWindow {
    hwnd: isize,
    closing: AtomicBool,
}

impl OwnerWindow {
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd: hwnd.0 as isize,
            closing: AtomicBool::new(false),
        }
    }

    pub fn hwnd(&self) -> HWND {
        HWND(self.hwnd as *mut c_void)
    }

    /// Refuse further dispatches; called as shutdown begins.
    ///
    /// A callback that passed the `closing` check just before this call can
    /// still be blocked in `SendMessageW` while this thread waits inside
    /// `UnregisterEndpointNotificationCallback`, which can hang exit. The
    /// window is a few instructions wide and only open during shutdown.
    pub fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }
}

impl OwnerThread for OwnerWindow {
    fn run_on_owner_thread(&self, action: &mut dyn FnMut()) -> std::result::Result<(), DispatchError> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(DispatchError::OwnerGone);
        }

        let hwnd = self.hwnd();
        let mut action = action;
        let ptr = &mut action as *mut &mut dyn FnMut();

        unsafe {
            if !IsWindow(hwnd).as_bool() {
                return Err(DispatchError::OwnerGone);
            }

            // Returns 0 if the window died before handling the message.
            match SendMessageW(hwnd, WM_RUN_ON_OWNER, WPARAM(0), LPARAM(ptr as isize)).0 {
                DISPATCH_DONE => Ok(()),
                DISPATCH_PANICKED => Err(DispatchError::ActionPanicked),
                _ => Err(DispatchError::OwnerGone),
            }
        }
    }
}

/// Blocking error box for failures before the tray exists.
pub fn show_error(msg: &str) {
    unsafe {
        let msg_wide: Vec<u16> = msg.encode_utf16().chain(std::iter::once(0)).collect();
        let title_wide: Vec<u16> = "AudioLeash Error".encode_utf16().chain(std::iter::once(0)).collect();
        MessageBoxW(None, PCWSTR(msg_wide.as_ptr()), PCWSTR(title_wide.as_ptr()), MB_OK | MB_ICONERROR);
    }
}
