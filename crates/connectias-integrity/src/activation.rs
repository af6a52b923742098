// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Permission-gated activation.
//!
//! Some detectors can only run once the user has granted a runtime
//! permission. A gated feature starts `Inactive`, moves to
//! `AwaitingPermission` when activation is attempted without the grant, and
//! becomes `Active` once the grant is reported. Denials are not errors.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Runtime permissions the monitor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ReadPhoneState,
    AccessFineLocation,
    AccessCoarseLocation,
}

impl Permission {
    /// Android manifest name of the permission.
    pub fn manifest_name(self) -> &'static str {
        match self {
            Permission::ReadPhoneState => "android.permission.READ_PHONE_STATE",
            Permission::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Permission::AccessCoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    Inactive,
    AwaitingPermission,
    Active,
}

impl ActivationState {
    fn to_raw(self) -> u8 {
        match self {
            ActivationState::Inactive => 0,
            ActivationState::AwaitingPermission => 1,
            ActivationState::Active => 2,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ActivationState::AwaitingPermission,
            2 => ActivationState::Active,
            _ => ActivationState::Inactive,
        }
    }
}

/// Lock-free activation state for one gated feature.
#[derive(Debug)]
pub struct Activation {
    permission: Permission,
    state: AtomicU8,
}

impl Activation {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            state: AtomicU8::new(ActivationState::Inactive.to_raw()),
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn state(&self) -> ActivationState {
        ActivationState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ActivationState) {
        self.state.store(state.to_raw(), Ordering::Release);
    }

    /// Moves `from` to `to` atomically. Returns false if the feature was
    /// not in `from`, so concurrent grant reports activate at most once.
    pub fn transition(&self, from: ActivationState, to: ActivationState) -> bool {
        self.state
            .compare_exchange(from.to_raw(), to.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_names() {
        assert_eq!(
            Permission::ReadPhoneState.manifest_name(),
            "android.permission.READ_PHONE_STATE"
        );
        assert_eq!(
            Permission::AccessCoarseLocation.manifest_name(),
            "android.permission.ACCESS_COARSE_LOCATION"
        );
    }

    #[test]
    fn test_transition_only_from_expected_state() {
        let activation = Activation::new(Permission::ReadPhoneState);
        assert_eq!(activation.state(), ActivationState::Inactive);

        assert!(!activation.transition(ActivationState::AwaitingPermission, ActivationState::Active));
        activation.set(ActivationState::AwaitingPermission);

        assert!(activation.transition(ActivationState::AwaitingPermission, ActivationState::Active));
        assert!(!activation.transition(ActivationState::AwaitingPermission, ActivationState::Active));
        assert_eq!(activation.state(), ActivationState::Active);
    }
}
