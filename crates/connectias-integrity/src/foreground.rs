// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Non-owning reference to the current foreground window.

use std::sync::{Arc, RwLock, Weak};

use crate::host::WindowHandle;

/// Activity lifecycle callbacks the monitor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Started,
    Resumed,
    Paused,
    Destroyed,
}

/// Slot updated from lifecycle callbacks. Holds a `Weak` so a destroyed
/// window is never kept alive by the monitor; "no window" is a normal state.
#[derive(Default)]
pub struct ForegroundSlot {
    current: RwLock<Option<Weak<dyn WindowHandle>>>,
}

impl ForegroundSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, window: &Arc<dyn WindowHandle>) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::downgrade(window));
    }

    /// Clears the slot only if it still points at `window`.
    pub fn clear_if(&self, window: &Arc<dyn WindowHandle>) -> bool {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let matches = current
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|w| std::ptr::addr_eq(Arc::as_ptr(&w), Arc::as_ptr(window)));
        if matches {
            *current = None;
        }
        matches
    }

    pub fn current(&self) -> Option<Arc<dyn WindowHandle>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(Weak::upgrade)
    }
}
