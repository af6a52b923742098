// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Platform-level mock location signals.

use tracing::debug;

use crate::error::ProbeError;
use crate::host::DeviceEnvironment;
use crate::location::LocationFix;
use crate::policy::TrustPolicy;

/// First API level with the mock-location app-op (Android 6.0).
const APP_OPS_MIN_SDK: u32 = 23;

/// Why a fix was classified as mocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockSignal {
    MockProvider,
    AllowMockSetting,
    AppOpAllowed,
    FakeGpsApp(String),
}

/// `isFromMockProvider` or the legacy developer setting.
pub fn basic_mock_signal(env: &dyn DeviceEnvironment, fix: &LocationFix) -> Option<MockSignal> {
    if fix.from_mock_provider {
        return Some(MockSignal::MockProvider);
    }
    match env.mock_location_setting() {
        Ok(Some(value)) if value != "0" => Some(MockSignal::AllowMockSetting),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "mock location setting not readable");
            None
        }
    }
}

pub fn app_op_signal(env: &dyn DeviceEnvironment) -> Option<MockSignal> {
    if env.sdk_level() < APP_OPS_MIN_SDK {
        return None;
    }
    match env.mock_location_op_allowed() {
        Ok(true) => Some(MockSignal::AppOpAllowed),
        Ok(false) => None,
        Err(e) => {
            debug!(error = %e, "mock location app-op not readable");
            None
        }
    }
}

pub fn fake_gps_app(env: &dyn DeviceEnvironment, policy: &TrustPolicy) -> Result<Option<String>, ProbeError> {
    let packages = env.installed_packages()?;
    Ok(packages.into_iter().find(|p| policy.is_fake_gps_package(p)))
}

/// First platform signal that marks `fix` as mocked.
pub fn mock_signal(
    env: &dyn DeviceEnvironment,
    policy: &TrustPolicy,
    fix: &LocationFix,
) -> Option<MockSignal> {
    if let Some(signal) = basic_mock_signal(env, fix) {
        return Some(signal);
    }
    if let Some(signal) = app_op_signal(env) {
        return Some(signal);
    }
    match fake_gps_app(env, policy) {
        Ok(found) => found.map(MockSignal::FakeGpsApp),
        Err(e) => {
            debug!(error = %e, "installed packages not readable");
            None
        }
    }
}
