//! History suspension
//!
//! Structural table edits are not recorded in the undo history. A
//! [`HistoryGuard`] suspends recording for as long as it lives and resumes it
//! when dropped, so every exit path of an operation resumes history.

use crate::EditorHost;
use std::ops::{Deref, DerefMut};

/// Suspends history on a host for the guard's lifetime
pub struct HistoryGuard<'a, H: EditorHost + ?Sized> {
    host: &'a mut H,
}

impl<'a, H: EditorHost + ?Sized> HistoryGuard<'a, H> {
    pub fn new(host: &'a mut H) -> Self {
        host.suspend_history();
        Self { host }
    }
}

impl<H: EditorHost + ?Sized> Deref for HistoryGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: EditorHost + ?Sized> DerefMut for HistoryGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: EditorHost + ?Sized> Drop for HistoryGuard<'_, H> {
    fn drop(&mut self) {
        self.host.resume_history();
    }
}

/// Suspension bookkeeping for a host's undo history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryState {
    /// Nesting depth of active suspensions
    suspended: usize,
    /// Changes recorded while history was active
    recorded: usize,
}

impl HistoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suspend(&mut self) {
        self.suspended += 1;
    }

    pub fn resume(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended > 0
    }

    pub fn depth(&self) -> usize {
        self.suspended
    }

    /// Note a change; it is only recorded when history is active
    pub fn record(&mut self) -> bool {
        if self.is_suspended() {
            return false;
        }
        self.recorded += 1;
        true
    }

    /// Number of changes recorded so far
    pub fn recorded(&self) -> usize {
        self.recorded
    }
}
