//! Platform-specific module for Windows utilities.
//!
//! This module contains the hidden owner window used to marshal work onto the
//! UI thread and the "Start with Windows" registry toggle.

pub mod registry;
pub mod window;

pub use registry::{RegistryError, StartupRegistration};
pub use window::OwnerWindow;
