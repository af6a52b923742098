// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! # Connectias Integrity
//!
//! Runtime integrity monitor for the Connectias app. A [`MonitorSession`]
//! periodically checks for debuggers, hook frameworks, untrusted installers,
//! repackaged signatures, screen-capture tools, an insecure foreground
//! window and spoofed locations, and reports every positive finding to a
//! [`DetectionSink`]. Call-state transitions are forwarded to the same sink.
//!
//! Probes never fail the monitor: anything a probe cannot determine counts
//! as "no detection" for that tick.

pub mod activation;
pub mod call_state;
pub mod config;
pub mod error;
pub mod event;
pub mod foreground;
pub mod host;
pub mod location;
pub mod policy;
pub mod probes;
pub mod session;

#[cfg(test)]
mod testing;

pub use activation::{ActivationState, Permission};
pub use call_state::{CallStateWatcher, RegistrationOutcome};
pub use config::MonitorConfig;
pub use error::{MonitorError, ProbeError, Result};
pub use event::{CallState, DetectionEvent, DetectionSink, TracingSink};
pub use foreground::{ForegroundSlot, LifecycleEvent};
pub use host::{
    DeviceEnvironment, LocationSource, PermissionRequester, ProcfsEnvironment, SensorKind,
    SensorService, TelephonyService, Unsupported, WindowHandle,
};
pub use location::{LocationFix, LocationGuard, MotionThresholds};
pub use policy::TrustPolicy;
pub use probes::ProbeKind;
pub use session::{MonitorSession, MonitorSessionBuilder, StartOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
