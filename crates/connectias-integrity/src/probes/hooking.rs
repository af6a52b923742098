// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Hook framework detection (Xposed, Frida, Substrate, Magisk modules).
//!
//! Three independent techniques, any of which is enough:
//! 1. memory-map scan for hook libraries or libraries outside trusted roots
//! 2. class resolution of known hook framework entry points
//! 3. call stack inspection for frames outside the app and platform namespaces

use tracing::debug;

use crate::error::ProbeError;
use crate::host::DeviceEnvironment;
use crate::policy::TrustPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapsFinding {
    /// A mapping whose line names a hook framework.
    Keyword { keyword: String, line: String },
    /// A native library mapped from outside every trusted root.
    UntrustedLibrary(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookFinding {
    Maps(MapsFinding),
    Class(String),
    StackFrame(String),
}

/// Pathname column of a `/proc/<pid>/maps` line, if the mapping has one.
fn mapped_path(line: &str) -> Option<&str> {
    // address perms offset dev inode pathname
    let mut rest = line.trim();
    for _ in 0..5 {
        let (_, tail) = rest.split_once(char::is_whitespace)?;
        rest = tail.trim_start();
    }
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Scans memory-map content.
///
/// A library is suspicious only when it lies outside ALL trusted roots and
/// is not part of the app itself.
pub fn scan_memory_maps(maps: &str, policy: &TrustPolicy) -> Option<MapsFinding> {
    for line in maps.lines() {
        let lower = line.to_lowercase();
        if let Some(keyword) = policy.hook_keyword_in(&lower) {
            return Some(MapsFinding::Keyword {
                keyword: keyword.to_string(),
                line: line.trim().to_string(),
            });
        }

        let Some(path) = mapped_path(&lower) else {
            continue;
        };
        let is_library = path.ends_with(".so") || path.contains("/lib/");
        if is_library && !policy.is_trusted_library(path) {
            return Some(MapsFinding::UntrustedLibrary(path.to_string()));
        }
    }
    None
}

pub fn resolve_hook_class(
    env: &dyn DeviceEnvironment,
    policy: &TrustPolicy,
) -> Result<Option<String>, ProbeError> {
    for class in &policy.hook_classes {
        if env.class_resolves(class)? {
            return Ok(Some(class.clone()));
        }
    }
    Ok(None)
}

/// First frame naming a hook framework or coming from a foreign namespace.
pub fn foreign_stack_frame(frames: &[String], policy: &TrustPolicy) -> Option<String> {
    frames
        .iter()
        .find(|frame| policy.hook_keyword_in(frame).is_some() || !policy.is_safe_namespace(frame))
        .cloned()
}

fn logged<T>(result: Result<Option<T>, ProbeError>, technique: &str) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(e) => {
            debug!(error = %e, technique, "hook detection technique inconclusive");
            None
        }
    }
}

/// Runs all techniques in order and returns the first finding.
pub fn detect_hooks(env: &dyn DeviceEnvironment, policy: &TrustPolicy) -> Option<HookFinding> {
    let maps = env.memory_maps().map(|m| scan_memory_maps(&m, policy));
    if let Some(finding) = logged(maps, "maps") {
        return Some(HookFinding::Maps(finding));
    }
    if let Some(class) = logged(resolve_hook_class(env, policy), "class") {
        return Some(HookFinding::Class(class));
    }
    let stack = env
        .capture_stack()
        .map(|frames| foreign_stack_frame(&frames, policy));
    logged(stack, "stack").map(HookFinding::StackFrame)
}

pub fn is_hooked(env: &dyn DeviceEnvironment, policy: &TrustPolicy) -> bool {
    match detect_hooks(env, policy) {
        Some(finding) => {
            debug!(?finding, "hook indicator");
            true
        }
        None => false,
    }
}
