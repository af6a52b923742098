// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Signing certificate validation (repackaging detection).

use sha2::{Digest, Sha256};

use crate::error::ProbeError;
use crate::host::DeviceEnvironment;
use crate::policy::{format_fingerprint, TrustPolicy};

/// First API level exposing `SigningInfo` (Android 9).
pub const SIGNING_INFO_MIN_SDK: u32 = 28;

/// SHA-256 fingerprint of a DER certificate, `AB:CD:..` form.
pub fn certificate_fingerprint(certificate: &[u8]) -> String {
    format_fingerprint(&Sha256::digest(certificate))
}

/// Signing certificates of the running package, using `SigningInfo` where
/// the platform has it and the legacy signature list otherwise.
pub fn signing_certificates(env: &dyn DeviceEnvironment) -> Result<Vec<Vec<u8>>, ProbeError> {
    if env.sdk_level() >= SIGNING_INFO_MIN_SDK {
        env.signing_info_signers()?
            .ok_or_else(|| ProbeError::unavailable("package has no signing info"))
    } else {
        env.legacy_signatures()
    }
}

/// True if ANY signing certificate matches an expected fingerprint.
pub fn is_signature_valid(env: &dyn DeviceEnvironment, policy: &TrustPolicy) -> Result<bool, ProbeError> {
    let certificates = signing_certificates(env)?;
    Ok(certificates
        .iter()
        .any(|cert| policy.expects_fingerprint(&certificate_fingerprint(cert))))
}
