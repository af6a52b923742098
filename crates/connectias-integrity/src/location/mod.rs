// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Location spoofing detection.
//!
//! A fix is "likely spoofed" when the platform marks it as mocked
//! ([`mock`]) or when the jump from the previous fix is inconsistent with
//! the device's own motion ([`motion`]).

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::host::DeviceEnvironment;
use crate::policy::TrustPolicy;

pub mod mock;
pub mod motion;

pub use mock::MockSignal;
pub use motion::{MotionEvidence, MotionSpoofDetector, MotionThresholds};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Wall-clock time of the fix, milliseconds since the Unix epoch.
    pub time_millis: i64,
    #[serde(default)]
    pub accuracy_m: Option<f32>,
    #[serde(default)]
    pub from_mock_provider: bool,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, time_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            time_millis,
            accuracy_m: None,
            from_mock_provider: false,
        }
    }

    pub fn from_mock_provider(mut self) -> Self {
        self.from_mock_provider = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationAssessment {
    pub mock_signal: Option<MockSignal>,
    pub motion_suspicious: bool,
}

impl LocationAssessment {
    pub fn is_spoofed(&self) -> bool {
        self.mock_signal.is_some() || self.motion_suspicious
    }
}

/// Tracks consecutive fixes and combines both heuristics.
pub struct LocationGuard {
    policy: Arc<TrustPolicy>,
    motion: MotionSpoofDetector,
    previous: Mutex<Option<LocationFix>>,
}

impl LocationGuard {
    pub fn new(policy: Arc<TrustPolicy>, thresholds: MotionThresholds) -> Self {
        Self {
            policy,
            motion: MotionSpoofDetector::new(thresholds),
            previous: Mutex::new(None),
        }
    }

    pub fn motion(&self) -> &MotionSpoofDetector {
        &self.motion
    }

    /// Assesses `fix` against the platform signals and the previous fix.
    ///
    /// The elapsed time comes from the fixes' own timestamps. A fix that is
    /// not newer than the previous one gets no speed check and does not
    /// replace it, so polling the same last-known fix is harmless.
    pub fn assess(&self, env: &dyn DeviceEnvironment, fix: &LocationFix) -> LocationAssessment {
        let motion_suspicious = {
            let mut previous = self.previous.lock().unwrap_or_else(|e| e.into_inner());
            let elapsed = previous
                .as_ref()
                .map(|p| fix.time_millis.saturating_sub(p.time_millis))
                .unwrap_or(0);
            let suspicious = self
                .motion
                .is_movement_suspicious(previous.as_ref(), fix, elapsed);
            if previous.is_none() || elapsed > 0 {
                *previous = Some(fix.clone());
            }
            suspicious
        };

        let mock_signal = mock::mock_signal(env, &self.policy, fix);
        let assessment = LocationAssessment {
            mock_signal,
            motion_suspicious,
        };
        debug!(?assessment, "location assessed");
        assessment
    }

    /// Push-driven entry point for hosts receiving location callbacks.
    pub fn on_fix(&self, env: &dyn DeviceEnvironment, fix: &LocationFix) -> bool {
        self.assess(env, fix).is_spoofed()
    }

    /// Forgets the previous fix.
    pub fn reset(&self) {
        *self.previous.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
