//! Device notification bridge.
//!
//! Turns default-device-changed callbacks into decisions and drives the
//! resulting switch or clear. Callbacks arrive on a COM worker thread; every
//! switch and every user-visible side effect is marshalled onto the owner
//! thread through [`OwnerThread`].
//!
//! The owner-thread user operations (pick, clear, restore on startup) live
//! here too so that all writers of [`SelectionState`] share one set of
//! collaborators.

use crate::audio::{AudioError, DataFlow, DeviceRole, DispatchError, PlaybackDevice};
use crate::selection::{RestoreDecision, SelectionSnapshot, SelectionState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Enumeration of playback endpoints.
pub trait DeviceSource: Send + Sync {
    /// All active render endpoints.
    fn active_playback_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError>;

    /// ID of the current default render endpoint, if there is one.
    fn default_playback_device_id(&self) -> Result<Option<String>, AudioError>;
}

/// Sets the Windows default playback endpoint.
///
/// Implementations may only be called on the owner thread.
pub trait EndpointSwitch: Send + Sync {
    /// Make `device_id` the default for every role.
    fn set_default_for_all_roles(&self, device_id: &str) -> Result<(), AudioError>;
}

/// Synchronous hop onto the owner thread.
pub trait OwnerThread: Send + Sync {
    /// Run `action` on the owner thread and wait for it to finish.
    ///
    /// Returns [`DispatchError::OwnerGone`] without running the action when
    /// the owner has already been torn down.
    fn run_on_owner_thread(&self, action: &mut dyn FnMut()) -> Result<(), DispatchError>;
}

/// Notice severity, mapped to the balloon icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// User-visible surface. Only called on the owner thread.
pub trait UserFeedback: Send + Sync {
    /// Fire-and-forget notice.
    fn notify(&self, title: &str, body: &str, severity: Severity);

    /// The pinned device changed; refresh tooltip and icon.
    fn selection_changed(&self, selected: Option<&PlaybackDevice>);
}

/// Persistence of the pinned device. Best-effort: never fails.
pub trait SelectionStore: Send + Sync {
    fn load_selected_device_id(&self) -> Option<String>;

    fn save_selected_device_id(&self, device_id: Option<&str>);
}

/// External collaborators of the bridge.
#[derive(Clone)]
pub struct Collaborators {
    pub devices: Arc<dyn DeviceSource>,
    pub switcher: Arc<dyn EndpointSwitch>,
    pub owner: Arc<dyn OwnerThread>,
    pub feedback: Arc<dyn UserFeedback>,
    pub store: Arc<dyn SelectionStore>,
}

/// Bridge between Windows device notifications and the selection state machine.
pub struct DeviceBridge {
    state: Arc<SelectionState>,
    devices: Arc<dyn DeviceSource>,
    switcher: Arc<dyn EndpointSwitch>,
    owner: Arc<dyn OwnerThread>,
    feedback: Arc<dyn UserFeedback>,
    store: Arc<dyn SelectionStore>,
}

impl DeviceBridge {
    /// Create a bridge over `state`.
    pub fn new(state: Arc<SelectionState>, collaborators: Collaborators) -> Self {
        Self {
            state,
            devices: collaborators.devices,
            switcher: collaborators.switcher,
            owner: collaborators.owner,
            feedback: collaborators.feedback,
            store: collaborators.store,
        }
    }

    /// Shared selection state.
    pub fn state(&self) -> &Arc<SelectionState> {
        &self.state
    }

    /// Handle a default-device-changed callback. Runs on the notification thread.
    ///
    /// Windows raises one callback per role for a single change; only
    /// render/multimedia is acted on so a change produces one reaction.
    pub fn on_default_device_changed(
        &self,
        flow: DataFlow,
        role: DeviceRole,
        new_default_id: Option<&str>,
    ) -> RestoreDecision {
        if flow != DataFlow::Render || role != DeviceRole::Multimedia {
            debug!(?flow, ?role, "Ignoring default device change");
            return RestoreDecision::NoAction;
        }

        let snapshot = self.state.snapshot();

        let mut active = Vec::new();
        let available = match snapshot.selected_device_id.as_deref() {
            Some(selected) if !snapshot.is_internal_change => {
                match self.devices.active_playback_devices() {
                    Ok(devices) => {
                        active = devices;
                        active.iter().any(|d| d.id == selected)
                    }
                    Err(e) => {
                        warn!("Cannot check pinned device availability: {e}");
                        return RestoreDecision::NoAction;
                    }
                }
            }
            _ => false,
        };

        let decision = snapshot.evaluate(new_default_id, available);
        debug!(?decision, new_default = ?new_default_id, "Default playback device changed");

        match decision {
            RestoreDecision::NoAction => {}
            RestoreDecision::ClearSelection => self.clear_unavailable(&snapshot),
            RestoreDecision::Restore => self.restore(&snapshot, &active),
        }

        decision
    }

    fn clear_unavailable(&self, snapshot: &SelectionSnapshot) {
        let Some(selected) = snapshot.selected_device_id.as_deref() else {
            return;
        };

        if !self.state.clear_if(selected) {
            debug!("Selection changed since snapshot, not clearing");
            return;
        }

        info!(device_id = selected, "Pinned device unavailable, selection cleared");

        let result = self.owner.run_on_owner_thread(&mut || {
            self.store.save_selected_device_id(None);
            self.feedback.selection_changed(None);
            self.feedback.notify(
                "Device unavailable",
                "The pinned playback device is no longer available. Selection cleared.",
                Severity::Warning,
            );
        });

        if let Err(e) = result {
            debug!("Dropped clear notice: {e}");
        }
    }

    fn restore(&self, snapshot: &SelectionSnapshot, active: &[PlaybackDevice]) {
        let Some(target) = snapshot.selected_device_id.as_deref() else {
            return;
        };

        // Raised here, before the hop, so a callback arriving while the owner
        // thread is busy already sees the switch as ours.
        let _guard = self.state.begin_internal_change();

        let device = active
            .iter()
            .find(|d| d.id == target)
            .cloned()
            .unwrap_or_else(|| PlaybackDevice::new(target, target));

        let result = self.owner.run_on_owner_thread(&mut || {
            match self.switcher.set_default_for_all_roles(&device.id) {
                Ok(()) => {
                    info!(device = %device.name, "Restored pinned playback device");
                    self.feedback.selection_changed(Some(&device));
                    self.feedback.notify(
                        "Device restored",
                        &format!("Switched back to {}", device.name),
                        Severity::Info,
                    );
                }
                Err(e) => {
                    warn!(device = %device.name, "Restore failed: {e}");
                    self.feedback.notify(
                        "Restore failed",
                        &format!("Could not switch back to {}: {e}", device.name),
                        Severity::Error,
                    );
                }
            }
        });

        if let Err(e) = result {
            debug!("Restore dispatch dropped: {e}");
        }
    }

    /// Pin `device_id` and make it the default. Owner thread only.
    pub fn select_device(&self, device_id: &str) -> Result<(), AudioError> {
        let device = self.find_active(device_id)?;

        {
            let _guard = self.state.begin_internal_change();
            if let Err(e) = self.switcher.set_default_for_all_roles(&device.id) {
                warn!(device = %device.name, "Switch failed: {e}");
                self.feedback.notify(
                    "Switch failed",
                    &format!("Could not switch to {}: {e}", device.name),
                    Severity::Error,
                );
                return Err(e);
            }
            // Pinned before the flag drops, so a late echo of this switch
            // already matches the selection.
            self.state.select(device.id.clone());
        }

        self.store.save_selected_device_id(Some(&device.id));
        self.feedback.selection_changed(Some(&device));
        info!(device = %device.name, "Pinned playback device");
        self.feedback.notify(
            "Device pinned",
            &format!("Pinned to {}", device.name),
            Severity::Info,
        );

        Ok(())
    }

    /// Forget the pinned device. Owner thread only.
    pub fn clear_selection(&self) {
        self.state.clear();
        self.store.save_selected_device_id(None);
        self.feedback.selection_changed(None);
        info!("Selection cleared");
        self.feedback.notify(
            "Selection cleared",
            "The default playback device is no longer pinned.",
            Severity::Info,
        );
    }

    /// Re-pin the persisted device at startup. Owner thread only.
    ///
    /// Returns whether a selection was established.
    pub fn restore_on_startup(&self) -> bool {
        let Some(saved) = self.store.load_selected_device_id() else {
            return false;
        };

        let device = match self.find_active(&saved) {
            Ok(device) => device,
            Err(e) => {
                warn!(device_id = %saved, "Saved device not restorable: {e}");
                self.forget_saved(
                    "The previously pinned playback device is not available.".to_string(),
                );
                return false;
            }
        };

        {
            let _guard = self.state.begin_internal_change();
            if let Err(e) = self.switcher.set_default_for_all_roles(&device.id) {
                warn!(device = %device.name, "Startup restore failed: {e}");
                self.forget_saved(format!("Could not switch to {}: {e}", device.name));
                return false;
            }
            self.state.select(device.id.clone());
        }

        self.feedback.selection_changed(Some(&device));
        info!(device = %device.name, "Restored pinned device at startup");
        true
    }

    /// The pinned device resolved against the active device list.
    pub fn selected_device(&self) -> Option<PlaybackDevice> {
        let selected = self.state.selected_device_id()?;
        match self.devices.active_playback_devices() {
            Ok(devices) => devices.into_iter().find(|d| d.id == selected),
            Err(e) => {
                warn!("Failed to list playback devices: {e}");
                None
            }
        }
    }

    fn find_active(&self, device_id: &str) -> Result<PlaybackDevice, AudioError> {
        self.devices
            .active_playback_devices()?
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| AudioError::DeviceNotFound {
                device_id: device_id.to_string(),
            })
    }

    fn forget_saved(&self, body: String) {
        self.store.save_selected_device_id(None);
        self.feedback.selection_changed(None);
        self.feedback
            .notify("Device unavailable", &body, Severity::Warning);
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    pub struct FakeDevices {
        pub active: Mutex<Vec<PlaybackDevice>>,
        pub fail: Mutex<bool>,
    }

    impl FakeDevices {
        pub fn with(ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                active: Mutex::new(
                    ids.iter()
                        .map(|id| PlaybackDevice::new(*id, format!("Speakers {id}")))
                        .collect(),
                ),
                fail: Mutex::new(false),
            })
        }
    }

    impl DeviceSource for FakeDevices {
        fn active_playback_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError> {
            if *self.fail.lock().unwrap() {
                return Err(AudioError::EnumerationFailed { code: -1 });
            }
            Ok(self.active.lock().unwrap().clone())
        }

        fn default_playback_device_id(&self) -> Result<Option<String>, AudioError> {
            Ok(self.active.lock().unwrap().first().map(|d| d.id.clone()))
        }
    }

    /// Records each switch and whether the internal flag was up at the time.
    pub struct RecordingSwitch {
        pub state: Arc<SelectionState>,
        pub calls: Mutex<Vec<(String, bool)>>,
        pub fail_with: Mutex<Option<AudioError>>,
    }

    impl RecordingSwitch {
        pub fn new(state: &Arc<SelectionState>) -> Arc<Self> {
            Arc::new(Self {
                state: Arc::clone(state),
                calls: Mutex::new(Vec::new()),
                fail_with: Mutex::new(None),
            })
        }

        pub fn calls(&self) -> Vec<(String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EndpointSwitch for RecordingSwitch {
        fn set_default_for_all_roles(&self, device_id: &str) -> Result<(), AudioError> {
            self.calls
                .lock()
                .unwrap()
                .push((device_id.to_string(), self.state.is_internal_change()));
            match self.fail_with.lock().unwrap().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    /// Runs actions inline, or refuses them like a destroyed window.
    pub struct InlineOwner {
        pub gone: bool,
    }

    impl OwnerThread for InlineOwner {
        fn run_on_owner_thread(&self, action: &mut dyn FnMut()) -> Result<(), DispatchError> {
            if self.gone {
                return Err(DispatchError::OwnerGone);
            }
            action();
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingFeedback {
        pub notices: Mutex<Vec<(String, Severity)>>,
        pub selections: Mutex<Vec<Option<String>>>,
    }

    impl RecordingFeedback {
        pub fn titles(&self) -> Vec<String> {
            self.notices.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    impl UserFeedback for RecordingFeedback {
        fn notify(&self, title: &str, _body: &str, severity: Severity) {
            self.notices.lock().unwrap().push((title.to_string(), severity));
        }

        fn selection_changed(&self, selected: Option<&PlaybackDevice>) {
            self.selections
                .lock()
                .unwrap()
                .push(selected.map(|d| d.id.clone()));
        }
    }

    #[derive(Default)]
    pub struct MemoryStore {
        pub saved: Mutex<Option<String>>,
        pub writes: Mutex<Vec<Option<String>>>,
    }

    impl SelectionStore for MemoryStore {
        fn load_selected_device_id(&self) -> Option<String> {
            self.saved.lock().unwrap().clone()
        }

        fn save_selected_device_id(&self, device_id: Option<&str>) {
            let value = device_id.map(str::to_string);
            *self.saved.lock().unwrap() = value.clone();
            self.writes.lock().unwrap().push(value);
        }
    }

    pub struct Rig {
        pub state: Arc<SelectionState>,
        pub devices: Arc<FakeDevices>,
        pub switcher: Arc<RecordingSwitch>,
        pub feedback: Arc<RecordingFeedback>,
        pub store: Arc<MemoryStore>,
        pub bridge: DeviceBridge,
    }

    impl Rig {
        pub fn new(active: &[&str]) -> Self {
            Self::with_owner(active, false)
        }

        pub fn with_owner(active: &[&str], owner_gone: bool) -> Self {
            let state = Arc::new(SelectionState::new());
            let devices = FakeDevices::with(active);
            let switcher = RecordingSwitch::new(&state);
            let feedback = Arc::new(RecordingFeedback::default());
            let store = Arc::new(MemoryStore::default());
            let bridge = DeviceBridge::new(
                Arc::clone(&state),
                Collaborators {
                    devices: devices.clone(),
                    switcher: switcher.clone(),
                    owner: Arc::new(InlineOwner { gone: owner_gone }),
                    feedback: feedback.clone(),
                    store: store.clone(),
                },
            );
            Self {
                state,
                devices,
                switcher,
                feedback,
                store,
                bridge,
            }
        }
    }
}
