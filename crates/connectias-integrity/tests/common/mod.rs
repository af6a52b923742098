// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Fake host capabilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use connectias_integrity::host::{CallListener, SensorListener, FLAG_SECURE};
use connectias_integrity::probes::signature::certificate_fingerprint;
use connectias_integrity::{
    CallState, DetectionEvent, DetectionSink, DeviceEnvironment, LocationFix, LocationSource,
    MonitorConfig, Permission, PermissionRequester, ProbeError, SensorKind, SensorService,
    TelephonyService, TrustPolicy, WindowHandle,
};

pub const APP_ID: &str = "com.ble1st.connectias";
pub const CERT: &[u8] = b"connectias release certificate";

const CLEAN_MAPS: &str = "\
70f4a000-70f6b000 r--p 00000000 fd:00 1234 /system/framework/arm64/boot.art
7a1b2000-7a1c3000 r-xp 00000000 fd:00 2345 /apex/com.android.runtime/lib64/bionic/libc.so
7b000000-7b010000 r-xp 00000000 fd:05 3456 /data/app/com.ble1st.connectias-1/lib/arm64/libconnectias.so
";

/// Which call should panic or stall, to exercise probe isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    PanicOnPackages,
    StallOnInstaller(Duration),
}

/// A device on which every probe comes back clean.
pub struct TestEnv {
    pub debugger: AtomicBool,
    pub permissions: Mutex<Vec<Permission>>,
    pub fault: Fault,
}

impl TestEnv {
    pub fn clean() -> Self {
        Self {
            debugger: AtomicBool::new(false),
            permissions: Mutex::new(vec![
                Permission::ReadPhoneState,
                Permission::AccessFineLocation,
            ]),
            fault: Fault::None,
        }
    }

    pub fn with_fault(fault: Fault) -> Self {
        Self {
            fault,
            ..Self::clean()
        }
    }

    pub fn without_permissions() -> Self {
        let env = Self::clean();
        env.permissions.lock().unwrap().clear();
        env
    }
}

impl DeviceEnvironment for TestEnv {
    fn is_debugger_connected(&self) -> Result<bool, ProbeError> {
        Ok(self.debugger.load(Ordering::SeqCst))
    }

    fn is_waiting_for_debugger(&self) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn process_status(&self) -> Result<String, ProbeError> {
        Ok("Name:\tconnectias\nTracerPid:\t0\n".to_string())
    }

    fn memory_maps(&self) -> Result<String, ProbeError> {
        Ok(CLEAN_MAPS.to_string())
    }

    fn class_resolves(&self, _class_name: &str) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn capture_stack(&self) -> Result<Vec<String>, ProbeError> {
        Ok(vec![
            "com.ble1st.connectias.core.security.IntegrityMonitor".to_string(),
            "kotlinx.coroutines.DispatchedTask".to_string(),
            "java.lang.Thread".to_string(),
        ])
    }

    fn installer_package(&self) -> Result<Option<String>, ProbeError> {
        if let Fault::StallOnInstaller(delay) = self.fault {
            std::thread::sleep(delay);
        }
        Ok(Some("com.android.vending".to_string()))
    }

    fn sdk_level(&self) -> u32 {
        33
    }

    fn signing_info_signers(&self) -> Result<Option<Vec<Vec<u8>>>, ProbeError> {
        Ok(Some(vec![CERT.to_vec()]))
    }

    fn legacy_signatures(&self) -> Result<Vec<Vec<u8>>, ProbeError> {
        Ok(vec![CERT.to_vec()])
    }

    fn installed_packages(&self) -> Result<Vec<String>, ProbeError> {
        if self.fault == Fault::PanicOnPackages {
            panic!("package manager died");
        }
        Ok(vec!["com.android.chrome".to_string(), APP_ID.to_string()])
    }

    fn mock_location_setting(&self) -> Result<Option<String>, ProbeError> {
        Ok(Some("0".to_string()))
    }

    fn mock_location_op_allowed(&self) -> Result<bool, ProbeError> {
        Ok(false)
    }

    fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.lock().unwrap().contains(&permission)
    }
}

pub fn config() -> MonitorConfig {
    MonitorConfig {
        secure_flag_poll_ms: 20,
        probe_timeout_ms: 1000,
        policy: TrustPolicy {
            app_id: APP_ID.to_string(),
            expected_fingerprints: vec![certificate_fingerprint(CERT)],
            ..TrustPolicy::default()
        },
        ..MonitorConfig::default()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DetectionEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DetectionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &DetectionEvent) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

impl DetectionSink for RecordingSink {
    fn handle(&self, event: DetectionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct FakeTelephony {
    listener: Mutex<Option<CallListener>>,
    pub registrations: AtomicUsize,
}

impl FakeTelephony {
    pub fn emit(&self, state: CallState, number: Option<&str>) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(state, number.map(str::to_string));
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }
}

impl TelephonyService for FakeTelephony {
    fn listen(&self, listener: CallListener) -> Result<(), ProbeError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn stop_listening(&self) {
        self.listener.lock().unwrap().take();
    }
}

#[derive(Default)]
pub struct FakeSensors {
    listener: Mutex<Option<SensorListener>>,
}

impl FakeSensors {
    pub fn emit(&self, sample: [f32; 3]) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(sample);
        }
    }

    pub fn is_registered(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }
}

impl SensorService for FakeSensors {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        kind == SensorKind::LinearAcceleration
    }

    fn register(&self, _kind: SensorKind, listener: SensorListener) -> Result<(), ProbeError> {
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn unregister(&self) {
        self.listener.lock().unwrap().take();
    }
}

pub struct TestWindow {
    flags: AtomicU32,
}

impl TestWindow {
    pub fn secure() -> Self {
        Self {
            flags: AtomicU32::new(FLAG_SECURE),
        }
    }

    pub fn set_secure(&self, secure: bool) {
        let flags = if secure { FLAG_SECURE } else { 0 };
        self.flags.store(flags, Ordering::SeqCst);
    }
}

impl WindowHandle for TestWindow {
    fn window_flags(&self) -> Result<u32, ProbeError> {
        Ok(self.flags.load(Ordering::SeqCst))
    }
}

pub struct FixedLocation(pub Mutex<Option<LocationFix>>);

impl LocationSource for FixedLocation {
    fn last_fix(&self) -> Option<LocationFix> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingRequester {
    pub requested: Mutex<Vec<Permission>>,
}

impl PermissionRequester for RecordingRequester {
    fn request(&self, permission: Permission) {
        self.requested.lock().unwrap().push(permission);
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
