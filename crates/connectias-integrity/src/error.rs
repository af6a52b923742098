// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Error types for the integrity monitor.
//!
//! Probe errors never leave the scheduler: they are logged and the probe
//! contributes "no detection" for that tick. Only [`MonitorError`] reaches
//! callers, from configuration loading and from [`crate::MonitorSession::start`].

use std::time::Duration;

use thiserror::Error;

use crate::activation::Permission;

/// Why a single probe could not produce a verdict.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("permission not granted: {0:?}")]
    PermissionDenied(Permission),

    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

impl ProbeError {
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable(what.into())
    }
}

/// Errors surfaced to the host application.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no tokio runtime available to schedule the monitor")]
    NoRuntime,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to parse configuration: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
