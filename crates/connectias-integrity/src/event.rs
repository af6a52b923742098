// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Detection events and the callback sink contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Telephony call state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    Idle,
    Ringing,
    OffHook,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallStateError {
    #[error("unknown call state code: {0}")]
    UnknownCode(i32),
}

impl TryFrom<i32> for CallState {
    type Error = CallStateError;

    /// Android `TelephonyManager.CALL_STATE_*` codes.
    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(CallState::Idle),
            1 => Ok(CallState::Ringing),
            2 => Ok(CallState::OffHook),
            other => Err(CallStateError::UnknownCode(other)),
        }
    }
}

/// One positive detection. Produced by a probe or watcher and handed to the
/// sink immediately; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionEvent {
    DebuggerDetected,
    HookDetected,
    UntrustedInstaller,
    InvalidSignature,
    ScreenCaptureAppDetected,
    SecureFlagDisabled,
    MockLocationDetected,
    CallStateChanged {
        state: CallState,
        number: Option<String>,
    },
}

impl DetectionEvent {
    /// Stable identifier, used in log lines and JSON reports.
    pub fn name(&self) -> &'static str {
        match self {
            DetectionEvent::DebuggerDetected => "debugger_detected",
            DetectionEvent::HookDetected => "hook_detected",
            DetectionEvent::UntrustedInstaller => "untrusted_installer",
            DetectionEvent::InvalidSignature => "invalid_signature",
            DetectionEvent::ScreenCaptureAppDetected => "screen_capture_app_detected",
            DetectionEvent::SecureFlagDisabled => "secure_flag_disabled",
            DetectionEvent::MockLocationDetected => "mock_location_detected",
            DetectionEvent::CallStateChanged { .. } => "call_state_changed",
        }
    }
}

/// Host-supplied handler of detection events.
///
/// Called from monitor tasks; implementations must return quickly and hand
/// slow work off to their own executor.
pub trait DetectionSink: Send + Sync {
    fn handle(&self, event: DetectionEvent);
}

impl<F> DetectionSink for F
where
    F: Fn(DetectionEvent) + Send + Sync,
{
    fn handle(&self, event: DetectionEvent) {
        self(event)
    }
}

/// Sink that writes every event to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DetectionSink for TracingSink {
    fn handle(&self, event: DetectionEvent) {
        match &event {
            DetectionEvent::CallStateChanged { state, .. } => {
                info!(event = event.name(), ?state, "call state changed");
            }
            _ => warn!(event = event.name(), "integrity detection"),
        }
    }
}
