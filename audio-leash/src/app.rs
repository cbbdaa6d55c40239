//! Application state and lifecycle management.
//!
//! Everything here runs on the owner thread: the hidden window's message
//! loop, the tray menu, and user picks.

use crate::audio::{
    ComGuard, DeviceNotificationClient, EndpointSubscription, PlaybackDevice,
    PolicyConfigSwitcher, WindowsDeviceSource,
};
use crate::bridge::{Collaborators, DeviceBridge, DeviceSource};
use crate::platform::window::{self, run_dispatched, show_error, WM_RUN_ON_OWNER, WM_TRAY_ICON};
use crate::platform::{OwnerWindow, StartupRegistration};
use crate::selection::SelectionState;
use crate::settings::JsonSelectionStore;
use crate::ui::menu::{self, MenuModel};
use crate::ui::TrayIcon;
use anyhow::Context;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use windows::core::*;
use windows::Win32::Foundation::*;
use windows::Win32::UI::WindowsAndMessaging::*;

/// Main application state.
pub struct AppState {
    hwnd: HWND,
    bridge: Arc<DeviceBridge>,
    owner: Arc<OwnerWindow>,
    tray: Arc<TrayIcon>,
    devices: Arc<WindowsDeviceSource>,
    startup: StartupRegistration,
    subscription: Option<EndpointSubscription>,
    /// Devices listed in the menu that is currently open
    menu_devices: Vec<PlaybackDevice>,
}

impl AppState {
    fn new(hwnd: HWND) -> anyhow::Result<Self> {
        let switcher = PolicyConfigSwitcher::new().context("Default device switching unavailable")?;

        let store = JsonSelectionStore::in_settings_dir().unwrap_or_else(|e| {
            warn!("{e}; keeping settings beside the executable");
            JsonSelectionStore::new(crate::config::SETTINGS_FILE_NAME)
        });
        info!(path = %store.path().display(), "Using settings file");

        let owner = Arc::new(OwnerWindow::new(hwnd));
        let tray = Arc::new(TrayIcon::new(hwnd, None).context("Failed to create tray icon")?);
        let devices = Arc::new(WindowsDeviceSource::new().context("Failed to open device enumerator")?);

        let bridge = Arc::new(DeviceBridge::new(
            Arc::new(SelectionState::new()),
            Collaborators {
                devices: devices.clone(),
                switcher: Arc::new(switcher),
                owner: owner.clone(),
                feedback: tray.clone(),
                store: Arc::new(store),
            },
        ));

        bridge.restore_on_startup();

        let subscription = EndpointSubscription::register(
            devices.raw_enumerator(),
            DeviceNotificationClient::new(bridge.clone()),
        )?;

        TASKBAR_CREATED.store(
            unsafe { RegisterWindowMessageW(w!("TaskbarCreated")) },
            Ordering::Relaxed,
        );

        Ok(Self {
            hwnd,
            bridge,
            owner,
            tray,
            devices,
            startup: StartupRegistration::new(),
            subscription: Some(subscription),
            menu_devices: Vec::new(),
        })
    }

    fn show_menu(&mut self, x: i32, y: i32) {
        self.menu_devices = self.devices.active_playback_devices().unwrap_or_else(|e| {
            warn!("Failed to list playback devices: {e}");
            Vec::new()
        });
        let default_id = self.devices.default_playback_device_id().ok().flatten();
        let selected_id = self.bridge.state().selected_device_id();

        let model = MenuModel {
            devices: &self.menu_devices,
            selected_id: selected_id.as_deref(),
            default_id: default_id.as_deref(),
            is_startup: self.startup.is_enabled(),
        };

        match menu::show_context_menu(self.hwnd, x, y, &model) {
            Ok(0) => {}
            Ok(cmd_id) => self.handle_command(cmd_id),
            Err(e) => warn!("Failed to show context menu: {e}"),
        }
    }

    fn handle_command(&mut self, cmd_id: u32) {
        match cmd_id {
            menu::CMD_EXIT => {
                // WM_DESTROY arrives while the state is still borrowed here
                self.shutdown();
                unsafe {
                    let _ = DestroyWindow(self.hwnd);
                }
            }
            menu::CMD_CLEAR_SELECTION => self.bridge.clear_selection(),
            menu::CMD_TOGGLE_STARTUP => match self.startup.toggle() {
                Ok(enabled) => info!(enabled, "Start with Windows toggled"),
                Err(e) => warn!("Failed to toggle Start with Windows: {e}"),
            },
            id if id >= menu::CMD_DEVICE_BASE => {
                let index = (id - menu::CMD_DEVICE_BASE) as usize;
                if let Some(device) = self.menu_devices.get(index).cloned() {
                    // Failures are already surfaced as a balloon
                    let _ = self.bridge.select_device(&device.id);
                }
            }
            _ => {}
        }
    }

    fn readd_tray_icon(&self) {
        let selected = self.bridge.selected_device();
        if let Err(e) = self.tray.add(selected.as_ref()) {
            warn!("Failed to re-add tray icon: {e}");
        }
    }

    /// Stop callbacks before the window goes away.
    fn shutdown(&mut self) {
        self.owner.close();
        self.subscription = None;
        self.tray.remove();
    }
}

/// Broadcast sent when Explorer (and the notification area) restarts.
static TASKBAR_CREATED: AtomicU32 = AtomicU32::new(0);

thread_local! {
    static APP_STATE: RefCell<Option<Rc<RefCell<AppState>>>> = const { RefCell::new(None) };
}

/// Run `f` against the app state, unless it is absent or already borrowed
/// further up the stack (re-entrant window messages).
fn with_app_state<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut AppState) -> R,
{
    APP_STATE.with(|state| {
        let app = state.borrow().as_ref().cloned()?;
        let mut app = app.try_borrow_mut().ok()?;
        Some(f(&mut app))
    })
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        // Must not touch APP_STATE: it can arrive while a COM call made from
        // inside with_app_state is pumping messages.
        WM_RUN_ON_OWNER => run_dispatched(lparam),
        WM_TRAY_ICON => {
            let event = (lparam.0 & 0xFFFF) as u32;
            match event {
                WM_LBUTTONUP | WM_CONTEXTMENU => {
                    let mut pt = POINT::default();
                    let _ = GetCursorPos(&mut pt);
                    with_app_state(|app| app.show_menu(pt.x, pt.y));
                }
                _ => {}
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            with_app_state(|app| app.shutdown());
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ if msg != 0 && msg == TASKBAR_CREATED.load(Ordering::Relaxed) => {
            with_app_state(|app| app.readd_tray_icon());
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Create the owner window, wire up the bridge, and pump messages until exit.
pub fn run() -> anyhow::Result<()> {
    let _com = ComGuard::new()?;

    let hwnd = window::create_owner_window(w!("AudioLeash"), Some(window_proc))
        .context("Failed to create owner window")?;

    let app_state = match AppState::new(hwnd) {
        Ok(state) => Rc::new(RefCell::new(state)),
        Err(e) => {
            show_error(&format!("AudioLeash could not start: {e:#}"));
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(e);
        }
    };
    APP_STATE.with(|state| *state.borrow_mut() = Some(app_state));
    info!("AudioLeash running");

    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).into() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    // COM objects must be released before the apartment is torn down
    APP_STATE.with(|state| state.borrow_mut().take());
    info!("AudioLeash stopped");

    Ok(())
}
