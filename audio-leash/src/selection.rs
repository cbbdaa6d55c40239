//! Device selection state machine.
//!
//! Decides how to react when Windows reports a new default playback device.
//! Holds the user's pinned device and the flag that marks switches this
//! process started itself. No I/O happens here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Reaction to an externally observed default-device change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreDecision {
    /// Nothing to do.
    NoAction,

    /// Switch the default back to the pinned device.
    Restore,

    /// The pinned device is gone; forget it.
    ClearSelection,
}

/// Point-in-time copy of the selection state.
///
/// The bridge takes exactly one snapshot per notification and carries it
/// through the availability check, the decision and the restore target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSnapshot {
    /// Pinned device ID, if any
    pub selected_device_id: Option<String>,

    /// Whether a self-initiated switch was in flight
    pub is_internal_change: bool,
}

impl SelectionSnapshot {
    /// Decide the reaction to `new_default_id`. First matching rule wins.
    ///
    /// `new_default_id` is `None` when Windows reports that no default
    /// device exists at all; that never matches a selection.
    pub fn evaluate(
        &self,
        new_default_id: Option<&str>,
        is_selected_device_available: bool,
    ) -> RestoreDecision {
        if self.is_internal_change {
            return RestoreDecision::NoAction;
        }

        let Some(selected) = self.selected_device_id.as_deref() else {
            return RestoreDecision::NoAction;
        };

        if new_default_id == Some(selected) {
            return RestoreDecision::NoAction;
        }

        if !is_selected_device_available {
            return RestoreDecision::ClearSelection;
        }

        RestoreDecision::Restore
    }
}

/// Selection state shared between the owner thread and the notification thread.
#[derive(Debug, Default)]
pub struct SelectionState {
    selected_device_id: Mutex<Option<String>>,
    is_internal_change: AtomicBool,
}

impl SelectionState {
    /// Create an empty state: nothing pinned, no switch in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide against the current state. See [`SelectionSnapshot::evaluate`].
    pub fn evaluate(&self, new_default_id: &str, is_selected_device_available: bool) -> RestoreDecision {
        self.snapshot()
            .evaluate(Some(new_default_id), is_selected_device_available)
    }

    /// Copy the selection and the flag under the selection lock.
    pub fn snapshot(&self) -> SelectionSnapshot {
        let selected = self.lock();
        SelectionSnapshot {
            selected_device_id: selected.clone(),
            is_internal_change: self.is_internal_change(),
        }
    }

    /// Currently pinned device ID.
    pub fn selected_device_id(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Pin a device. Last write wins.
    pub fn select(&self, device_id: impl Into<String>) {
        *self.lock() = Some(device_id.into());
    }

    /// Forget the pinned device. No-op when nothing is pinned.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Forget the pinned device only if it is still `expected`.
    ///
    /// Returns whether the selection was cleared. A pick made by the user
    /// after `expected` was snapshotted is left in place.
    pub fn clear_if(&self, expected: &str) -> bool {
        let mut selected = self.lock();
        if selected.as_deref() == Some(expected) {
            *selected = None;
            true
        } else {
            false
        }
    }

    /// Whether a self-initiated switch is in flight.
    pub fn is_internal_change(&self) -> bool {
        self.is_internal_change.load(Ordering::SeqCst)
    }

    /// Raw write of the internal-change flag.
    ///
    /// Prefer [`SelectionState::begin_internal_change`], which cannot leak a
    /// stuck `true`.
    pub fn set_internal_change(&self, value: bool) {
        self.is_internal_change.store(value, Ordering::SeqCst);
    }

    /// Mark a self-initiated switch until the returned guard is dropped.
    pub fn begin_internal_change(&self) -> InternalChangeGuard<'_> {
        self.set_internal_change(true);
        InternalChangeGuard { state: self }
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        // A panic while holding the lock cannot leave the Option half-written.
        self.selected_device_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets the internal-change flag on every exit path, unwinding included.
#[must_use = "the flag is reset as soon as the guard is dropped"]
#[derive(Debug)]
pub struct InternalChangeGuard<'a> {
    state: &'a SelectionState,
}

impl Drop for InternalChangeGuard<'_> {
    fn drop(&mut self) {
        self.state.set_internal_change(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn selected(id: &str) -> SelectionState {
        let state = SelectionState::new();
        state.select(id);
        state
    }

    #[test]
    fn fresh_state_has_no_selection_and_flag_clear() {
        let state = SelectionState::new();
        assert_eq!(state.selected_device_id(), None);
        assert!(!state.is_internal_change());
    }

    #[test]
    fn no_selection_never_acts() {
        let state = SelectionState::new();
        assert_eq!(state.evaluate("dev-1", true), RestoreDecision::NoAction);
        assert_eq!(state.evaluate("dev-1", false), RestoreDecision::NoAction);
    }

    #[test]
    fn internal_change_suppresses_every_decision() {
        let state = selected("dev-1");
        state.set_internal_change(true);

        for (id, available) in [("dev-1", true), ("dev-2", true), ("dev-2", false), ("", false)] {
            assert_eq!(state.evaluate(id, available), RestoreDecision::NoAction);
        }
    }

    #[test]
    fn matching_default_is_left_alone_whether_or_not_available() {
        let state = selected("dev-1");
        assert_eq!(state.evaluate("dev-1", true), RestoreDecision::NoAction);
        assert_eq!(state.evaluate("dev-1", false), RestoreDecision::NoAction);
    }

    #[test]
    fn external_change_with_device_present_restores() {
        let state = selected("dev-1");
        assert_eq!(state.evaluate("dev-2", true), RestoreDecision::Restore);
    }

    #[test]
    fn external_change_with_device_missing_clears() {
        let state = selected("dev-1");
        assert_eq!(state.evaluate("dev-2", false), RestoreDecision::ClearSelection);
    }

    #[test]
    fn missing_default_counts_as_a_different_device() {
        let snapshot = SelectionSnapshot {
            selected_device_id: Some("dev-1".into()),
            is_internal_change: false,
        };
        assert_eq!(snapshot.evaluate(None, true), RestoreDecision::Restore);
        assert_eq!(snapshot.evaluate(None, false), RestoreDecision::ClearSelection);
    }

    #[test]
    fn select_is_last_write_wins() {
        let state = SelectionState::new();
        state.select("dev-1");
        state.select("dev-2");
        state.select("dev-2");
        assert_eq!(state.selected_device_id().as_deref(), Some("dev-2"));
    }

    #[test]
    fn clear_is_idempotent() {
        let state = selected("dev-1");
        state.clear();
        assert_eq!(state.selected_device_id(), None);
        state.clear();
        assert_eq!(state.selected_device_id(), None);
    }

    #[test]
    fn clear_if_leaves_a_newer_pick_alone() {
        let state = selected("dev-2");
        assert!(!state.clear_if("dev-1"));
        assert_eq!(state.selected_device_id().as_deref(), Some("dev-2"));

        assert!(state.clear_if("dev-2"));
        assert_eq!(state.selected_device_id(), None);
    }

    #[test]
    fn snapshot_captures_selection_and_flag() {
        let state = selected("dev-1");
        let _guard = state.begin_internal_change();
        assert_eq!(
            state.snapshot(),
            SelectionSnapshot {
                selected_device_id: Some("dev-1".into()),
                is_internal_change: true,
            }
        );
    }

    #[test]
    fn guard_resets_flag_on_drop() {
        let state = SelectionState::new();
        {
            let _guard = state.begin_internal_change();
            assert!(state.is_internal_change());
        }
        assert!(!state.is_internal_change());
    }

    #[test]
    fn guard_resets_flag_when_unwinding() {
        let state = Arc::new(SelectionState::new());
        let inner = Arc::clone(&state);

        let result = std::panic::catch_unwind(move || {
            let _guard = inner.begin_internal_change();
            panic!("switch blew up");
        });

        assert!(result.is_err());
        assert!(!state.is_internal_change());
    }

    #[test]
    fn flag_written_on_one_thread_is_seen_on_another() {
        let state = Arc::new(selected("dev-1"));
        let writer = Arc::clone(&state);

        std::thread::spawn(move || writer.set_internal_change(true))
            .join()
            .unwrap();

        assert_eq!(state.evaluate("dev-2", true), RestoreDecision::NoAction);
    }
}
