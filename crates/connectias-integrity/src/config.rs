// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Monitor configuration.
//!
//! ```toml
//! tick_interval_ms = 5000
//! secure_flag_poll_ms = 1000
//! probe_timeout_ms = 2000
//!
//! [motion]
//! still_speed_mps = 5.0
//!
//! [policy]
//! app_id = "com.ble1st.connectias"
//! expected_fingerprints = ["AB:CD:..."]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::location::MotionThresholds;
use crate::policy::TrustPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub tick_interval_ms: u64,
    pub secure_flag_poll_ms: u64,
    pub probe_timeout_ms: u64,
    pub motion: MotionThresholds,
    pub policy: TrustPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5000,
            secure_flag_poll_ms: 1000,
            probe_timeout_ms: 2000,
            motion: MotionThresholds::default(),
            policy: TrustPolicy::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MonitorConfig = toml::from_str(content)?;
        config.validated()
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: MonitorConfig = serde_json::from_str(content)?;
        config.validated()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validated(mut self) -> Result<Self> {
        for (name, value) in [
            ("tick_interval_ms", self.tick_interval_ms),
            ("secure_flag_poll_ms", self.secure_flag_poll_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
        ] {
            if value == 0 {
                return Err(MonitorError::Config(format!("{name} must be greater than zero")));
            }
        }
        self.motion.validate()?;
        self.policy = self.policy.validated()?;
        Ok(self)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn secure_flag_poll(&self) -> Duration {
        Duration::from_millis(self.secure_flag_poll_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
