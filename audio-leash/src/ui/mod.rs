//! UI module for the notification-area icon and its context menu.

pub mod menu;
pub mod tray;

pub use tray::TrayIcon;
