// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! In-crate fake host for unit tests.

use crate::activation::Permission;
use crate::error::ProbeError;
use crate::host::DeviceEnvironment;

#[derive(Debug, Default, Clone)]
pub struct FakeEnvironment {
    pub debugger_connected: bool,
    pub waiting_for_debugger: bool,
    pub status: Option<String>,
    pub maps: Option<String>,
    pub resolvable_classes: Vec<String>,
    pub stack: Vec<String>,
    pub installer: Option<String>,
    pub sdk: u32,
    pub signing_info: Option<Vec<Vec<u8>>>,
    pub legacy_signatures: Vec<Vec<u8>>,
    pub packages: Vec<String>,
    pub mock_setting: Option<String>,
    pub mock_op_allowed: bool,
    pub permissions: Vec<Permission>,
    pub fail_everything: bool,
}

impl FakeEnvironment {
    fn gate(&self) -> Result<(), ProbeError> {
        if self.fail_everything {
            Err(ProbeError::unavailable("fake failure"))
        } else {
            Ok(())
        }
    }
}

impl DeviceEnvironment for FakeEnvironment {
    fn is_debugger_connected(&self) -> Result<bool, ProbeError> {
        self.gate()?;
        Ok(self.debugger_connected)
    }

    fn is_waiting_for_debugger(&self) -> Result<bool, ProbeError> {
        self.gate()?;
        Ok(self.waiting_for_debugger)
    }

    fn process_status(&self) -> Result<String, ProbeError> {
        self.gate()?;
        self.status.clone().ok_or_else(|| ProbeError::unavailable("status"))
    }

    fn memory_maps(&self) -> Result<String, ProbeError> {
        self.gate()?;
        self.maps.clone().ok_or_else(|| ProbeError::unavailable("maps"))
    }

    fn class_resolves(&self, class_name: &str) -> Result<bool, ProbeError> {
        self.gate()?;
        Ok(self.resolvable_classes.iter().any(|c| c == class_name))
    }

    fn capture_stack(&self) -> Result<Vec<String>, ProbeError> {
        self.gate()?;
        Ok(self.stack.clone())
    }

    fn installer_package(&self) -> Result<Option<String>, ProbeError> {
        self.gate()?;
        Ok(self.installer.clone())
    }

    fn sdk_level(&self) -> u32 {
        self.sdk
    }

    fn signing_info_signers(&self) -> Result<Option<Vec<Vec<u8>>>, ProbeError> {
        self.gate()?;
        Ok(self.signing_info.clone())
    }

    fn legacy_signatures(&self) -> Result<Vec<Vec<u8>>, ProbeError> {
        self.gate()?;
        Ok(self.legacy_signatures.clone())
    }

    fn installed_packages(&self) -> Result<Vec<String>, ProbeError> {
        self.gate()?;
        Ok(self.packages.clone())
    }

    fn mock_location_setting(&self) -> Result<Option<String>, ProbeError> {
        self.gate()?;
        Ok(self.mock_setting.clone())
    }

    fn mock_location_op_allowed(&self) -> Result<bool, ProbeError> {
        self.gate()?;
        Ok(self.mock_op_allowed)
    }

    fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
