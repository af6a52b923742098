// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Motion-spoof heuristic: GPS speed versus accelerometer evidence.
//!
//! Only the most recent accelerometer sample is kept, so a momentary rest
//! reading can mask real motion. The thresholds are tunable per deployment.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MonitorError;
use crate::host::{SensorKind, SensorListener, SensorService};
use crate::location::LocationFix;

/// Mean Earth radius in metres (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionThresholds {
    /// Speed above which a still device is suspicious (m/s).
    pub still_speed_mps: f64,
    /// Magnitude below which the device counts as still.
    pub still_magnitude: f64,
    /// Speed that is never plausible (m/s).
    pub implausible_speed_mps: f64,
    /// Vehicular speed that needs some device motion (m/s).
    pub vehicle_speed_mps: f64,
    pub vehicle_magnitude: f64,
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self {
            still_speed_mps: 5.0,
            still_magnitude: 0.2,
            implausible_speed_mps: 100.0,
            vehicle_speed_mps: 40.0,
            vehicle_magnitude: 0.5,
        }
    }
}

impl MotionThresholds {
    pub fn validate(&self) -> Result<(), MonitorError> {
        let values = [
            ("still_speed_mps", self.still_speed_mps),
            ("still_magnitude", self.still_magnitude),
            ("implausible_speed_mps", self.implausible_speed_mps),
            ("vehicle_speed_mps", self.vehicle_speed_mps),
            ("vehicle_magnitude", self.vehicle_magnitude),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(MonitorError::Config(format!(
                    "motion.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Applies the verdict rules in order; the first match wins.
pub fn is_speed_suspicious(gps_speed: f64, magnitude: f64, t: &MotionThresholds) -> bool {
    if gps_speed > t.still_speed_mps && magnitude < t.still_magnitude {
        return true;
    }
    if gps_speed > t.implausible_speed_mps {
        return true;
    }
    gps_speed > t.vehicle_speed_mps && magnitude < t.vehicle_magnitude
}

/// Great-circle distance between two fixes in metres.
pub fn distance_meters(a: &LocationFix, b: &LocationFix) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn magnitude(sample: [f32; 3]) -> f64 {
    let [x, y, z] = sample.map(f64::from);
    (x * x + y * y + z * z).sqrt()
}

/// Latest accelerometer magnitude, shared between the sensor callback and
/// the spoof check. Single writer, atomic bit-cast storage.
#[derive(Debug, Default)]
pub struct MotionEvidence {
    bits: AtomicU64,
}

impl MotionEvidence {
    pub fn record(&self, sample: [f32; 3]) {
        self.bits.store(magnitude(sample).to_bits(), Ordering::Relaxed);
    }

    pub fn magnitude(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.bits.store(0.0_f64.to_bits(), Ordering::Relaxed);
    }
}

pub struct MotionSpoofDetector {
    thresholds: MotionThresholds,
    evidence: Arc<MotionEvidence>,
    monitoring: AtomicBool,
}

impl MotionSpoofDetector {
    pub fn new(thresholds: MotionThresholds) -> Self {
        Self {
            thresholds,
            evidence: Arc::new(MotionEvidence::default()),
            monitoring: AtomicBool::new(false),
        }
    }

    pub fn evidence(&self) -> &Arc<MotionEvidence> {
        &self.evidence
    }

    /// Subscribes to linear acceleration, falling back to the raw
    /// accelerometer. Returns the sensor used, or `None` when the device
    /// has neither or is already being monitored.
    pub fn start_monitoring(&self, sensors: &dyn SensorService) -> Option<SensorKind> {
        if self.monitoring.swap(true, Ordering::AcqRel) {
            return None;
        }
        let kind = [SensorKind::LinearAcceleration, SensorKind::Accelerometer]
            .into_iter()
            .find(|k| sensors.has_sensor(*k));
        let Some(kind) = kind else {
            debug!("no acceleration sensor available, motion evidence stays at rest");
            self.monitoring.store(false, Ordering::Release);
            return None;
        };

        let evidence = Arc::clone(&self.evidence);
        let listener: SensorListener = Arc::new(move |sample| evidence.record(sample));
        if let Err(e) = sensors.register(kind, listener) {
            debug!(error = %e, ?kind, "sensor registration failed");
            self.monitoring.store(false, Ordering::Release);
            return None;
        }
        info!(?kind, "motion monitoring started");
        Some(kind)
    }

    pub fn stop_monitoring(&self, sensors: &dyn SensorService) {
        if self.monitoring.swap(false, Ordering::AcqRel) {
            sensors.unregister();
            info!("motion monitoring stopped");
        }
        self.evidence.reset();
    }

    /// Compares two consecutive fixes against the current motion evidence.
    /// No previous fix, or a non-positive interval, is never suspicious.
    pub fn is_movement_suspicious(
        &self,
        previous: Option<&LocationFix>,
        current: &LocationFix,
        elapsed_millis: i64,
    ) -> bool {
        let Some(previous) = previous else {
            return false;
        };
        if elapsed_millis <= 0 {
            return false;
        }
        let distance = distance_meters(previous, current);
        let speed = distance / (elapsed_millis as f64 / 1000.0);
        let magnitude = self.evidence.magnitude();
        debug!(speed, magnitude, distance, "motion spoof check");
        is_speed_suspicious(speed, magnitude, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(6.0, 0.1, true)]
    #[case(3.0, 0.1, false)]
    #[case(150.0, 5.0, true)]
    #[case(45.0, 0.3, true)]
    #[case(45.0, 2.0, false)]
    #[case(5.0, 0.1, false)]
    #[case(100.0, 1.0, false)]
    fn test_speed_verdict_table(#[case] speed: f64, #[case] magnitude: f64, #[case] expected: bool) {
        assert_eq!(
            is_speed_suspicious(speed, magnitude, &MotionThresholds::default()),
            expected
        );
    }

    #[test]
    fn test_magnitude_is_root_sum_square() {
        assert!((magnitude([3.0, 4.0, 0.0]) - 5.0).abs() < 1e-9);
        assert_eq!(magnitude([0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = LocationFix::new(0.0, 0.0, 0);
        let b = LocationFix::new(1.0, 0.0, 0);
        let d = distance_meters(&a, &b);
        assert!((d - 111_195.0).abs() < 50.0, "got {d}");
    }

    #[test]
    fn test_first_fix_is_never_suspicious() {
        let detector = MotionSpoofDetector::new(MotionThresholds::default());
        let fix = LocationFix::new(48.0, 11.0, 1_000);
        assert!(!detector.is_movement_suspicious(None, &fix, 10_000));
        assert!(!detector.is_movement_suspicious(None, &fix, 0));
    }

    #[test]
    fn test_non_positive_interval_is_skipped() {
        let detector = MotionSpoofDetector::new(MotionThresholds::default());
        let a = LocationFix::new(48.0, 11.0, 1_000);
        let b = LocationFix::new(49.0, 11.0, 1_000);
        assert!(!detector.is_movement_suspicious(Some(&a), &b, 0));
        assert!(!detector.is_movement_suspicious(Some(&a), &b, -5));
    }

    #[test]
    fn test_jump_while_still_is_suspicious() {
        let detector = MotionSpoofDetector::new(MotionThresholds::default());
        let a = LocationFix::new(48.0, 11.0, 0);
        // ~111 m in 5 s = ~22 m/s with the device at rest
        let b = LocationFix::new(48.001, 11.0, 5_000);
        assert!(detector.is_movement_suspicious(Some(&a), &b, 5_000));

        detector.evidence().record([0.0, 0.3, 0.1]);
        assert!(!detector.is_movement_suspicious(Some(&a), &b, 5_000));
    }

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let t = MotionThresholds {
            vehicle_magnitude: -1.0,
            ..MotionThresholds::default()
        };
        assert!(t.validate().is_err());
        assert!(MotionThresholds::default().validate().is_ok());
    }
}
