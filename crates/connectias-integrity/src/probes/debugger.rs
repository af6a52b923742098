// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Debugger attachment.

use crate::host::DeviceEnvironment;
use crate::probes::or_false;

/// TracerPid from `/proc/self/status` content.
/// A non-zero TracerPid indicates a debugger is attached.
pub fn parse_tracer_pid(status: &str) -> Option<i32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse::<i32>().ok())
}

/// True if the runtime reports a connected or awaited debugger, or the
/// kernel reports a tracer. Unreadable sources count as "not attached".
pub fn is_debugger_attached(env: &dyn DeviceEnvironment) -> bool {
    if or_false(env.is_debugger_connected(), "debugger connected flag")
        || or_false(env.is_waiting_for_debugger(), "waiting for debugger flag")
    {
        return true;
    }
    let tracer = env
        .process_status()
        .map(|status| parse_tracer_pid(&status).is_some_and(|pid| pid > 0));
    or_false(tracer, "process status")
}
