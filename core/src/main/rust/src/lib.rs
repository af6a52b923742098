// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Connectias Integrity Monitor - native bindings
//!
//! JNI entry points for `RustIntegrityMonitor`. The Kotlin layer owns the
//! platform queries (PackageManager, sensors, telephony); these functions
//! cover the process-level checks and the pure heuristics so both layers
//! agree on fingerprints and motion verdicts.

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jboolean, jdouble, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use serde::{Deserialize, Serialize};

#[cfg(target_os = "android")]
use android_logger::Config;
#[cfg(target_os = "android")]
use log::LevelFilter;

use connectias_integrity::host::procfs;
use connectias_integrity::location::motion::is_speed_suspicious;
use connectias_integrity::probes::debugger::parse_tracer_pid;
use connectias_integrity::probes::hooking::{scan_memory_maps, MapsFinding};
use connectias_integrity::probes::signature::certificate_fingerprint;
use connectias_integrity::{MotionThresholds, TrustPolicy};

const DEBUGGER_FALLBACK: &str = r#"{"is_debugger_attached":false,"tracer_pid":null,"detection_methods":[]}"#;
const MAPS_FALLBACK: &str = r#"{"is_hooked":false,"detection_methods":[]}"#;

/// Debugger detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggerReport {
    pub is_debugger_attached: bool,
    pub tracer_pid: Option<i32>,
    pub detection_methods: Vec<String>,
}

/// Memory map scan result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapsReport {
    pub is_hooked: bool,
    pub detection_methods: Vec<String>,
}

/// Debugger report from `/proc/self/status` content
pub fn debugger_report(status: &str) -> DebuggerReport {
    let tracer_pid = parse_tracer_pid(status);
    let mut detection_methods = Vec::new();
    if let Some(pid) = tracer_pid.filter(|pid| *pid > 0) {
        detection_methods.push(format!("TracerPid detected: {}", pid));
    }
    DebuggerReport {
        is_debugger_attached: !detection_methods.is_empty(),
        tracer_pid,
        detection_methods,
    }
}

/// Perform debugger detection
/// Note: Debug.isDebuggerConnected() is checked in Kotlin layer
pub fn detect_debugger() -> DebuggerReport {
    match procfs::read_self_status() {
        Ok(status) => debugger_report(&status),
        Err(e) => {
            log::debug!("process status unavailable: {}", e);
            debugger_report("")
        }
    }
}

/// Hook scan of memory map content, trusting libraries of `app_id`
pub fn maps_report(maps: &str, app_id: &str) -> MapsReport {
    let policy = TrustPolicy {
        app_id: app_id.to_string(),
        ..TrustPolicy::default()
    };
    let detection_methods: Vec<String> = scan_memory_maps(maps, &policy)
        .map(|finding| match finding {
            MapsFinding::Keyword { keyword, line } => format!("Hook library ({}): {}", keyword, line),
            MapsFinding::UntrustedLibrary(path) => format!("Untrusted library: {}", path),
        })
        .into_iter()
        .collect();
    MapsReport {
        is_hooked: !detection_methods.is_empty(),
        detection_methods,
    }
}

pub fn scan_own_maps(app_id: &str) -> MapsReport {
    match procfs::read_self_maps() {
        Ok(maps) => maps_report(&maps, app_id),
        Err(e) => {
            log::debug!("memory maps unavailable: {}", e);
            maps_report("", app_id)
        }
    }
}

/// JSON answer of `nativeScanMemoryMaps`. Without a readable app id the
/// app's own libraries cannot be told apart, so the clean fallback is used.
fn maps_json(app_id: Option<String>) -> String {
    let Some(app_id) = app_id else {
        return MAPS_FALLBACK.to_string();
    };
    serde_json::to_string(&scan_own_maps(&app_id)).unwrap_or_else(|_| MAPS_FALLBACK.to_string())
}

/// Motion verdict with the default thresholds
pub fn movement_suspicious(gps_speed: f64, magnitude: f64) -> bool {
    is_speed_suspicious(gps_speed, magnitude, &MotionThresholds::default())
}

fn json_or_fallback<T: Serialize>(env: &mut JNIEnv, value: &T, fallback: &str) -> jstring {
    let json = serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string());
    match env.new_string(&json) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => fallback_string(env, fallback),
    }
}

fn fallback_string(env: &mut JNIEnv, fallback: &str) -> jstring {
    match env.new_string(fallback) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

// ============================================================================
// JNI Bindings
// ============================================================================

/// Initialize logging for Android
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityMonitor_nativeInit(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Info)
            .with_tag("RustIntegrityMonitor"),
    );
    log::info!("integrity monitor {} loaded", connectias_integrity::VERSION);
}

#[cfg(not(target_os = "android"))]
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityMonitor_nativeInit(
    _env: JNIEnv,
    _class: JClass,
) {
    // No-op for non-Android platforms
}

/// Debugger detection - JNI entry point
///
/// Returns JSON string with DebuggerReport
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityMonitor_nativeDetectDebugger(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    let report = detect_debugger();
    json_or_fallback(&mut env, &report, DEBUGGER_FALLBACK)
}

/// Memory map hook scan - JNI entry point
///
/// Returns JSON string with MapsReport
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityMonitor_nativeScanMemoryMaps(
    mut env: JNIEnv,
    _class: JClass,
    app_id: JString,
) -> jstring {
    let app_id = env.get_string(&app_id).ok().map(String::from);
    let json = maps_json(app_id);
    match env.new_string(&json) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => fallback_string(&mut env, MAPS_FALLBACK),
    }
}

/// Certificate fingerprint - JNI entry point
///
/// Returns the SHA-256 fingerprint in `AB:CD:..` form, or null if the
/// array cannot be read
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityMonitor_nativeFingerprint(
    mut env: JNIEnv,
    _class: JClass,
    certificate: JByteArray,
) -> jstring {
    let bytes = match env.convert_byte_array(&certificate) {
        Ok(bytes) => bytes,
        Err(_) => return std::ptr::null_mut(),
    };
    match env.new_string(certificate_fingerprint(&bytes)) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Motion-spoof verdict - JNI entry point
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityMonitor_nativeIsMovementSuspicious(
    _env: JNIEnv,
    _class: JClass,
    gps_speed: jdouble,
    magnitude: jdouble,
) -> jboolean {
    if movement_suspicious(gps_speed, magnitude) {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}
