// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Native process inspection through procfs and `std::backtrace`.

use std::backtrace::Backtrace;
use std::fs;
use std::path::{Path, PathBuf};

use crate::activation::Permission;
use crate::error::ProbeError;
use crate::host::DeviceEnvironment;
use crate::policy::TrustPolicy;

const PROC_SELF: &str = "/proc/self";

/// Namespaces of the Rust runtime and the async stack the monitor runs on.
pub const NATIVE_SAFE_NAMESPACES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "tokio::",
    "tokio_util::",
    "tracing::",
    "connectias_integrity",
];

/// Library roots of a glibc or musl host.
pub const NATIVE_TRUSTED_LIBRARY_ROOTS: &[&str] = &["/usr/lib", "/lib", "/lib64", "/usr/local/lib"];

/// Widens `policy` for a process running directly on a Linux host: host
/// library roots, the executable's own directory and the Rust runtime
/// namespaces are trusted.
pub fn native_host_policy(mut policy: TrustPolicy) -> TrustPolicy {
    policy
        .trusted_library_roots
        .extend(NATIVE_TRUSTED_LIBRARY_ROOTS.iter().map(|root| root.to_string()));
    if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        policy
            .trusted_library_roots
            .push(dir.to_string_lossy().to_lowercase());
    }
    policy
        .safe_namespaces
        .extend(NATIVE_SAFE_NAMESPACES.iter().map(|ns| ns.to_string()));
    policy
}

pub fn read_self_status() -> Result<String, ProbeError> {
    read_proc_file(Path::new(PROC_SELF), "status")
}

pub fn read_self_maps() -> Result<String, ProbeError> {
    read_proc_file(Path::new(PROC_SELF), "maps")
}

fn read_proc_file(dir: &Path, name: &str) -> Result<String, ProbeError> {
    Ok(fs::read_to_string(dir.join(name))?)
}

/// Captures the current call stack and returns the namespace of every
/// frame that can be attributed to one.
pub fn capture_stack_namespaces() -> Vec<String> {
    let trace = Backtrace::force_capture().to_string();
    parse_backtrace(&trace)
}

/// Extracts frame symbols from `std::backtrace::Backtrace` output.
///
/// Frames without a `::` path (libc start routines, unresolved addresses)
/// are skipped. For trait impls `<T as Trait>::f` the implementing type is
/// used.
pub fn parse_backtrace(trace: &str) -> Vec<String> {
    trace
        .lines()
        .filter_map(|line| {
            let (index, symbol) = line.trim_start().split_once(": ")?;
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            frame_namespace(symbol.trim())
        })
        .collect()
}

fn frame_namespace(symbol: &str) -> Option<String> {
    let path = match symbol.strip_prefix('<') {
        Some(rest) => {
            let end = rest.find(" as ").or_else(|| rest.find('>')).unwrap_or(rest.len());
            &rest[..end]
        }
        None => symbol,
    };
    if path.contains("::") {
        Some(path.to_string())
    } else {
        None
    }
}

/// [`DeviceEnvironment`] for a native process without an Android runtime.
///
/// Only the process-level capabilities are real; package-manager and
/// settings queries report `Unavailable`, which the monitor treats as
/// "no detection".
#[derive(Debug, Clone)]
pub struct ProcfsEnvironment {
    proc_dir: PathBuf,
}

impl Default for ProcfsEnvironment {
    fn default() -> Self {
        Self {
            proc_dir: PathBuf::from(PROC_SELF),
        }
    }
}

impl ProcfsEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `status` and `maps` from `dir` instead of `/proc/self`.
    pub fn with_proc_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            proc_dir: dir.into(),
        }
    }
}

impl DeviceEnvironment for ProcfsEnvironment {
    fn is_debugger_connected(&self) -> Result<bool, ProbeError> {
        // No managed runtime: TracerPid is the only debugger signal.
        Ok(false)
    }

    fn is_waiting_for_debugger(&self) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn process_status(&self) -> Result<String, ProbeError> {
        read_proc_file(&self.proc_dir, "status")
    }

    fn memory_maps(&self) -> Result<String, ProbeError> {
        read_proc_file(&self.proc_dir, "maps")
    }

    fn class_resolves(&self, _class_name: &str) -> Result<bool, ProbeError> {
        Err(ProbeError::unavailable("class loader"))
    }

    fn capture_stack(&self) -> Result<Vec<String>, ProbeError> {
        Ok(capture_stack_namespaces())
    }

    fn installer_package(&self) -> Result<Option<String>, ProbeError> {
        Err(ProbeError::unavailable("package manager"))
    }

    fn sdk_level(&self) -> u32 {
        0
    }

    fn signing_info_signers(&self) -> Result<Option<Vec<Vec<u8>>>, ProbeError> {
        Err(ProbeError::unavailable("package manager"))
    }

    fn legacy_signatures(&self) -> Result<Vec<Vec<u8>>, ProbeError> {
        Err(ProbeError::unavailable("package manager"))
    }

    fn installed_packages(&self) -> Result<Vec<String>, ProbeError> {
        Err(ProbeError::unavailable("package manager"))
    }

    fn mock_location_setting(&self) -> Result<Option<String>, ProbeError> {
        Err(ProbeError::unavailable("settings provider"))
    }

    fn mock_location_op_allowed(&self) -> Result<bool, ProbeError> {
        Err(ProbeError::unavailable("app ops"))
    }

    fn has_permission(&self, _permission: Permission) -> bool {
        false
    }
}
