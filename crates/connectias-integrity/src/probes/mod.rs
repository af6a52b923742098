// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Signal probes and their isolated execution.
//!
//! Every probe answers "is this threat present?". A probe that cannot
//! answer (missing permission, unavailable service, malformed input,
//! timeout or panic) contributes no detection for the tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::activation::Permission;
use crate::error::ProbeError;
use crate::event::DetectionEvent;
use crate::foreground::ForegroundSlot;
use crate::host::{DeviceEnvironment, LocationSource};
use crate::location::LocationGuard;
use crate::policy::TrustPolicy;

pub mod debugger;
pub mod hooking;
pub mod installer;
pub mod screen_capture;
pub mod secure_flag;
pub mod signature;

pub use secure_flag::{SecureFlagTransition, SecureFlagWatcher};

/// Collapses an inconclusive result to "not detected".
pub(crate) fn or_false(result: Result<bool, ProbeError>, what: &str) -> bool {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, what, "probe input unavailable");
            false
        }
    }
}

/// Probes evaluated by a tick, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Debugger,
    Hook,
    Installer,
    Signature,
    ScreenCapture,
    SecureFlag,
    MockLocation,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 7] = [
        ProbeKind::Debugger,
        ProbeKind::Hook,
        ProbeKind::Installer,
        ProbeKind::Signature,
        ProbeKind::ScreenCapture,
        ProbeKind::SecureFlag,
        ProbeKind::MockLocation,
    ];

    /// Event dispatched when this probe detects its threat.
    pub fn event(self) -> DetectionEvent {
        match self {
            ProbeKind::Debugger => DetectionEvent::DebuggerDetected,
            ProbeKind::Hook => DetectionEvent::HookDetected,
            ProbeKind::Installer => DetectionEvent::UntrustedInstaller,
            ProbeKind::Signature => DetectionEvent::InvalidSignature,
            ProbeKind::ScreenCapture => DetectionEvent::ScreenCaptureAppDetected,
            ProbeKind::SecureFlag => DetectionEvent::SecureFlagDisabled,
            ProbeKind::MockLocation => DetectionEvent::MockLocationDetected,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProbeKind::Debugger => "debugger",
            ProbeKind::Hook => "hook",
            ProbeKind::Installer => "installer",
            ProbeKind::Signature => "signature",
            ProbeKind::ScreenCapture => "screen_capture",
            ProbeKind::SecureFlag => "secure_flag",
            ProbeKind::MockLocation => "mock_location",
        }
    }
}

/// Everything a probe may look at. Shared read-only across ticks.
pub struct ProbeContext {
    pub env: Arc<dyn DeviceEnvironment>,
    pub policy: Arc<TrustPolicy>,
    pub foreground: Arc<ForegroundSlot>,
    pub location: Arc<LocationGuard>,
    pub location_source: Option<Arc<dyn LocationSource>>,
}

impl ProbeContext {
    /// Runs one probe synchronously. `Ok(true)` means the threat is present.
    pub fn evaluate(&self, kind: ProbeKind) -> Result<bool, ProbeError> {
        let env = self.env.as_ref();
        match kind {
            ProbeKind::Debugger => Ok(debugger::is_debugger_attached(env)),
            ProbeKind::Hook => Ok(hooking::is_hooked(env, &self.policy)),
            ProbeKind::Installer => {
                installer::is_from_trusted_installer(env, &self.policy).map(|trusted| !trusted)
            }
            ProbeKind::Signature => {
                signature::is_signature_valid(env, &self.policy).map(|valid| !valid)
            }
            ProbeKind::ScreenCapture => {
                screen_capture::find_screen_capture_app(env, &self.policy).map(|found| {
                    if let Some(package) = &found {
                        debug!(package = %package, "screen capture app installed");
                    }
                    found.is_some()
                })
            }
            ProbeKind::SecureFlag => match self.foreground.current() {
                Some(window) => secure_flag::is_window_secure(window.as_ref()).map(|secure| !secure),
                None => Ok(false),
            },
            ProbeKind::MockLocation => self.evaluate_mock_location(),
        }
    }

    fn evaluate_mock_location(&self) -> Result<bool, ProbeError> {
        let env = self.env.as_ref();
        if !env.has_permission(Permission::AccessFineLocation)
            && !env.has_permission(Permission::AccessCoarseLocation)
        {
            return Err(ProbeError::PermissionDenied(Permission::AccessFineLocation));
        }
        let source = self
            .location_source
            .as_ref()
            .ok_or_else(|| ProbeError::unavailable("location source"))?;
        let Some(fix) = source.last_fix() else {
            return Ok(false);
        };
        Ok(self.location.assess(env, &fix).is_spoofed())
    }
}

/// Runs `kind` on the blocking pool under `timeout`.
///
/// A probe that errors, panics or overruns counts as "not detected". On
/// timeout the blocking task keeps running to completion and its result
/// is dropped.
pub async fn run_isolated(kind: ProbeKind, ctx: Arc<ProbeContext>, timeout: Duration) -> bool {
    let task = tokio::task::spawn_blocking(move || ctx.evaluate(kind));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(detected))) => detected,
        Ok(Ok(Err(e))) => {
            debug!(probe = kind.name(), error = %e, "probe inconclusive");
            false
        }
        Ok(Err(join_error)) => {
            warn!(probe = kind.name(), error = %join_error, "probe panicked");
            false
        }
        Err(_) => {
            warn!(probe = kind.name(), error = %ProbeError::Timeout(timeout), "probe timed out");
            false
        }
    }
}
