// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Trust policy: the allow-lists and deny-lists the probes match against.
//!
//! Loaded once with the monitor configuration and never mutated while a
//! session runs.

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Trusted distribution channels (Play Store, Play feedback, Amazon Appstore).
const TRUSTED_INSTALLERS: &[&str] = &[
    "com.android.vending",
    "com.google.android.feedback",
    "com.amazon.venezia",
];

/// Screen recording, mirroring and remote-control tools.
const SCREEN_CAPTURE_MARKERS: &[&str] = &["screenrecorder", "mirror", "cast", "scrcpy", "vysor"];

/// Fake-GPS and joystick tools.
const FAKE_GPS_MARKERS: &[&str] = &[
    "faker",
    "mock",
    "fakegps",
    "gpsjoy",
    "joystick",
    "scrcpy",
    "vysor",
    "fake gps",
    "gps spoof",
    "locaedit",
];

/// Hook framework name fragments found in memory maps and stack frames.
const HOOK_KEYWORDS: &[&str] = &["frida", "xposed", "substrate", "magisk"];

/// Entry points of common hook frameworks.
const HOOK_CLASSES: &[&str] = &[
    "de.robv.android.xposed.XposedBridge",
    "com.saurik.substrate.MS$",
    "com.frida.server",
];

/// Mapped libraries under these roots are platform-provided.
const TRUSTED_LIBRARY_ROOTS: &[&str] = &["/system", "/apex", "/vendor", "/product"];

/// Stack frame namespaces belonging to the platform runtime and stdlib.
const SAFE_NAMESPACES: &[&str] = &[
    "java.", "android.", "kotlin.", "kotlinx", "dalvik.", "sun.", "libcore.",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustPolicy {
    /// Application id of the protected app. Its libraries and stack frames
    /// are always trusted.
    pub app_id: String,
    /// SHA-256 fingerprints of the expected signing certificates.
    pub expected_fingerprints: Vec<String>,
    pub trusted_installers: Vec<String>,
    pub screen_capture_markers: Vec<String>,
    pub fake_gps_markers: Vec<String>,
    pub hook_keywords: Vec<String>,
    pub hook_classes: Vec<String>,
    pub trusted_library_roots: Vec<String>,
    pub safe_namespaces: Vec<String>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            expected_fingerprints: Vec::new(),
            trusted_installers: owned(TRUSTED_INSTALLERS),
            screen_capture_markers: owned(SCREEN_CAPTURE_MARKERS),
            fake_gps_markers: owned(FAKE_GPS_MARKERS),
            hook_keywords: owned(HOOK_KEYWORDS),
            hook_classes: owned(HOOK_CLASSES),
            trusted_library_roots: owned(TRUSTED_LIBRARY_ROOTS),
            safe_namespaces: owned(SAFE_NAMESPACES),
        }
    }
}

/// Canonical fingerprint form: upper-case hex bytes joined by `:`.
///
/// Accepts colon-separated or bare hex. Returns `None` for anything that
/// is not an even-length hex string.
pub fn normalize_fingerprint(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    let bytes = hex::decode(&digits).ok()?;
    Some(format_fingerprint(&bytes))
}

pub fn format_fingerprint(digest: &[u8]) -> String {
    digest
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

impl TrustPolicy {
    /// Normalizes fingerprints and lower-cases the substring lists.
    pub fn validated(mut self) -> Result<Self, MonitorError> {
        let mut fingerprints = Vec::with_capacity(self.expected_fingerprints.len());
        for raw in &self.expected_fingerprints {
            let fp = normalize_fingerprint(raw)
                .ok_or_else(|| MonitorError::Config(format!("invalid certificate fingerprint: {raw}")))?;
            fingerprints.push(fp);
        }
        self.expected_fingerprints = fingerprints;

        for list in [
            &mut self.screen_capture_markers,
            &mut self.fake_gps_markers,
            &mut self.hook_keywords,
        ] {
            for marker in list.iter_mut() {
                *marker = marker.to_lowercase();
            }
            list.retain(|m| !m.is_empty());
        }
        Ok(self)
    }

    pub fn is_trusted_installer(&self, installer: Option<&str>) -> bool {
        match installer {
            Some(id) => self.trusted_installers.iter().any(|t| t == id),
            None => false,
        }
    }

    pub fn expects_fingerprint(&self, fingerprint: &str) -> bool {
        self.expected_fingerprints.iter().any(|fp| fp == fingerprint)
    }

    pub fn is_screen_capture_package(&self, package: &str) -> bool {
        contains_any(package, &self.screen_capture_markers)
    }

    pub fn is_fake_gps_package(&self, package: &str) -> bool {
        contains_any(package, &self.fake_gps_markers)
    }

    /// First hook keyword contained in `text` (case-insensitive).
    pub fn hook_keyword_in(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.hook_keywords
            .iter()
            .find(|k| lower.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn is_trusted_library(&self, path: &str) -> bool {
        let app_id = self.app_id.to_lowercase();
        (!app_id.is_empty() && path.contains(&app_id))
            || self
                .trusted_library_roots
                .iter()
                .any(|root| path.starts_with(root.as_str()))
    }

    /// Whether a stack frame namespace belongs to the app, the platform
    /// runtime, or the standard library.
    pub fn is_safe_namespace(&self, namespace: &str) -> bool {
        let ns = namespace.to_lowercase();
        let app_id = self.app_id.to_lowercase();
        (!app_id.is_empty() && ns.starts_with(&app_id))
            || self
                .safe_namespaces
                .iter()
                .any(|prefix| ns.starts_with(&prefix.to_lowercase()))
    }
}

fn contains_any(package: &str, markers: &[String]) -> bool {
    let name = package.to_lowercase();
    markers.iter().any(|m| name.contains(m.as_str()))
}
