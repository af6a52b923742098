// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! FLAG_SECURE state of the foreground window.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::ProbeError;
use crate::host::{WindowHandle, FLAG_SECURE};

pub fn is_window_secure(window: &dyn WindowHandle) -> Result<bool, ProbeError> {
    Ok(window.window_flags()? & FLAG_SECURE != 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureFlagTransition {
    /// The window went from secure to insecure.
    Disabled,
    /// The window went from insecure back to secure.
    Restored,
}

const SECURE: u8 = 0;
const INSECURE: u8 = 1;

/// Remembers the last observed flag state so only changes are reported.
///
/// Starts out "secure": a window that is insecure on the first poll
/// reports [`SecureFlagTransition::Disabled`] once.
#[derive(Debug)]
pub struct SecureFlagWatcher {
    last: AtomicU8,
}

impl Default for SecureFlagWatcher {
    fn default() -> Self {
        Self {
            last: AtomicU8::new(SECURE),
        }
    }
}

impl SecureFlagWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` (no window, or unreadable flags) keeps the last state.
    pub fn observe(&self, secure: Option<bool>) -> Option<SecureFlagTransition> {
        let next = match secure? {
            true => SECURE,
            false => INSECURE,
        };
        let previous = self.last.swap(next, Ordering::AcqRel);
        match (previous, next) {
            (SECURE, INSECURE) => Some(SecureFlagTransition::Disabled),
            (INSECURE, SECURE) => Some(SecureFlagTransition::Restored),
            _ => None,
        }
    }

    pub fn reset(&self) {
        self.last.store(SECURE, Ordering::Release);
    }
}
