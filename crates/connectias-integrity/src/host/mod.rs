// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Capabilities the monitor needs from the host platform.
//!
//! The Android layer implements these on top of PackageManager,
//! TelephonyManager, SensorManager and friends. Every method may fail with
//! [`ProbeError`]; the monitor treats any failure as "no detection".

use std::sync::Arc;

use crate::activation::Permission;
use crate::error::ProbeError;
use crate::event::CallState;
use crate::location::LocationFix;

pub mod procfs;

pub use procfs::ProcfsEnvironment;

/// `WindowManager.LayoutParams.FLAG_SECURE`
pub const FLAG_SECURE: u32 = 0x0000_2000;

/// Point-in-time queries against the process and the package manager.
pub trait DeviceEnvironment: Send + Sync {
    fn is_debugger_connected(&self) -> Result<bool, ProbeError>;

    fn is_waiting_for_debugger(&self) -> Result<bool, ProbeError>;

    /// Contents of `/proc/self/status`.
    fn process_status(&self) -> Result<String, ProbeError> {
        procfs::read_self_status()
    }

    /// Contents of `/proc/self/maps`.
    fn memory_maps(&self) -> Result<String, ProbeError> {
        procfs::read_self_maps()
    }

    /// Whether `class_name` can be loaded by the app's class loader.
    fn class_resolves(&self, class_name: &str) -> Result<bool, ProbeError>;

    /// Namespaces (fully qualified class or module paths) of the frames on
    /// the current call stack, innermost first.
    fn capture_stack(&self) -> Result<Vec<String>, ProbeError>;

    /// Installer package recorded for the app; `None` when unknown.
    fn installer_package(&self) -> Result<Option<String>, ProbeError>;

    /// Platform API level (`Build.VERSION.SDK_INT`).
    fn sdk_level(&self) -> u32;

    /// Signer certificates from `SigningInfo` (API 28+). `None` when the
    /// package carries no signing info.
    fn signing_info_signers(&self) -> Result<Option<Vec<Vec<u8>>>, ProbeError>;

    /// Certificates from the legacy `GET_SIGNATURES` query.
    fn legacy_signatures(&self) -> Result<Vec<Vec<u8>>, ProbeError>;

    fn installed_packages(&self) -> Result<Vec<String>, ProbeError>;

    /// Raw value of `Settings.Secure.ALLOW_MOCK_LOCATION`.
    fn mock_location_setting(&self) -> Result<Option<String>, ProbeError>;

    /// Whether the mock-location app-op is allowed for the app's UID (API 23+).
    fn mock_location_op_allowed(&self) -> Result<bool, ProbeError>;

    fn has_permission(&self, permission: Permission) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    LinearAcceleration,
    Accelerometer,
}

pub type SensorListener = Arc<dyn Fn([f32; 3]) + Send + Sync>;

pub trait SensorService: Send + Sync {
    fn has_sensor(&self, kind: SensorKind) -> bool;

    fn register(&self, kind: SensorKind, listener: SensorListener) -> Result<(), ProbeError>;

    fn unregister(&self);
}

pub type CallListener = Arc<dyn Fn(CallState, Option<String>) + Send + Sync>;

pub trait TelephonyService: Send + Sync {
    fn listen(&self, listener: CallListener) -> Result<(), ProbeError>;

    fn stop_listening(&self);
}

/// Latest known location fix, as seen by the host's location client.
pub trait LocationSource: Send + Sync {
    fn last_fix(&self) -> Option<LocationFix>;
}

/// Asks the host UI to prompt for a runtime permission. The grant result
/// comes back through [`crate::MonitorSession::on_permission_result`],
/// which may be called from inside `request`.
pub trait PermissionRequester: Send + Sync {
    fn request(&self, permission: Permission);
}

/// Non-owning view of a foreground window.
pub trait WindowHandle: Send + Sync {
    fn window_flags(&self) -> Result<u32, ProbeError>;
}

/// Stand-in for hosts without sensors or telephony.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl SensorService for Unsupported {
    fn has_sensor(&self, _kind: SensorKind) -> bool {
        false
    }

    fn register(&self, _kind: SensorKind, _listener: SensorListener) -> Result<(), ProbeError> {
        Err(ProbeError::unavailable("sensor service"))
    }

    fn unregister(&self) {}
}

impl TelephonyService for Unsupported {
    fn listen(&self, _listener: CallListener) -> Result<(), ProbeError> {
        Err(ProbeError::unavailable("telephony service"))
    }

    fn stop_listening(&self) {}
}
