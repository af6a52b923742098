// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Screen recording / mirroring tool detection.

use crate::error::ProbeError;
use crate::host::DeviceEnvironment;
use crate::policy::TrustPolicy;

/// First installed package whose id contains a screen-capture marker.
pub fn find_screen_capture_app(
    env: &dyn DeviceEnvironment,
    policy: &TrustPolicy,
) -> Result<Option<String>, ProbeError> {
    Ok(env
        .installed_packages()?
        .into_iter()
        .find(|p| policy.is_screen_capture_package(p)))
}
