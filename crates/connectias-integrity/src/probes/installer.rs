// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Installer source validation.

use crate::error::ProbeError;
use crate::host::DeviceEnvironment;
use crate::policy::TrustPolicy;

/// Whether the app was installed through a trusted distribution channel.
/// An unknown installer is untrusted.
pub fn is_from_trusted_installer(
    env: &dyn DeviceEnvironment,
    policy: &TrustPolicy,
) -> Result<bool, ProbeError> {
    let installer = env.installer_package()?;
    Ok(policy.is_trusted_installer(installer.as_deref()))
}
