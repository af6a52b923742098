// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Call-state watcher.
//!
//! Registers one telephony listener per session and forwards every
//! reported transition to the sink verbatim. Registration needs
//! `READ_PHONE_STATE`; without it the watcher waits for a grant and never
//! fires in the meantime.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::activation::{Activation, ActivationState, Permission};
use crate::event::{DetectionEvent, DetectionSink};
use crate::host::{CallListener, DeviceEnvironment, PermissionRequester, TelephonyService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    AwaitingPermission,
    /// The telephony service refused the listener.
    Unavailable,
}

pub struct CallStateWatcher {
    telephony: Arc<dyn TelephonyService>,
    activation: Activation,
    sink: Mutex<Option<Arc<dyn DetectionSink>>>,
}

impl CallStateWatcher {
    pub fn new(telephony: Arc<dyn TelephonyService>) -> Self {
        Self {
            telephony,
            activation: Activation::new(Permission::ReadPhoneState),
            sink: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ActivationState {
        self.activation.state()
    }

    /// Registers the listener, or raises a permission request when
    /// `READ_PHONE_STATE` is missing. Calling it while registered is a no-op.
    pub fn start(
        &self,
        env: &dyn DeviceEnvironment,
        sink: Arc<dyn DetectionSink>,
        requester: Option<&dyn PermissionRequester>,
    ) -> RegistrationOutcome {
        match self.activation.state() {
            ActivationState::Active => return RegistrationOutcome::Registered,
            ActivationState::AwaitingPermission => return RegistrationOutcome::AwaitingPermission,
            ActivationState::Inactive => {}
        }
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);

        if env.has_permission(self.activation.permission()) {
            if !self.activation.transition(ActivationState::Inactive, ActivationState::Active) {
                return self.current_outcome();
            }
            return self.register();
        }

        if self
            .activation
            .transition(ActivationState::Inactive, ActivationState::AwaitingPermission)
        {
            debug!("READ_PHONE_STATE not granted, call state watcher waiting");
            if let Some(requester) = requester {
                requester.request(self.activation.permission());
            }
        }
        self.current_outcome()
    }

    /// Completes a pending registration after the permission was granted.
    /// Returns `None` when nothing was waiting for `permission`.
    pub fn on_permission_granted(&self, permission: Permission) -> Option<RegistrationOutcome> {
        if permission != self.activation.permission()
            || !self
                .activation
                .transition(ActivationState::AwaitingPermission, ActivationState::Active)
        {
            return None;
        }
        Some(self.register())
    }

    /// Unregisters the listener. Safe to call in any state.
    pub fn stop(&self) {
        let previous = self.activation.state();
        self.activation.set(ActivationState::Inactive);
        self.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
        if previous == ActivationState::Active {
            self.telephony.stop_listening();
            info!("call state watcher stopped");
        }
    }

    fn current_outcome(&self) -> RegistrationOutcome {
        match self.activation.state() {
            ActivationState::Active => RegistrationOutcome::Registered,
            _ => RegistrationOutcome::AwaitingPermission,
        }
    }

    /// Caller has already moved the activation to `Active`.
    fn register(&self) -> RegistrationOutcome {
        let Some(sink) = self.sink.lock().unwrap_or_else(|e| e.into_inner()).clone() else {
            self.activation.set(ActivationState::Inactive);
            return RegistrationOutcome::Unavailable;
        };
        let listener: CallListener = Arc::new(move |state, number| {
            sink.handle(DetectionEvent::CallStateChanged { state, number });
        });
        match self.telephony.listen(listener) {
            Ok(()) => {
                info!("call state watcher registered");
                RegistrationOutcome::Registered
            }
            Err(e) => {
                debug!(error = %e, "call state listener not registered");
                self.activation.set(ActivationState::Inactive);
                RegistrationOutcome::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::event::CallState;
    use crate::testing::FakeEnvironment;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeTelephony {
        listener: Mutex<Option<CallListener>>,
        registrations: AtomicUsize,
        unregistrations: AtomicUsize,
    }

    impl FakeTelephony {
        fn emit(&self, state: CallState, number: Option<&str>) {
            let listener = self.listener.lock().unwrap().clone();
            if let Some(listener) = listener {
                listener(state, number.map(str::to_string));
            }
        }
    }

    impl TelephonyService for FakeTelephony {
        fn listen(&self, listener: CallListener) -> Result<(), ProbeError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            *self.listener.lock().unwrap() = Some(listener);
            Ok(())
        }

        fn stop_listening(&self) {
            self.unregistrations.fetch_add(1, Ordering::SeqCst);
            self.listener.lock().unwrap().take();
        }
    }

    #[derive(Default)]
    struct Requests(Mutex<Vec<Permission>>);

    impl PermissionRequester for Requests {
        fn request(&self, permission: Permission) {
            self.0.lock().unwrap().push(permission);
        }
    }

    fn recording_sink() -> (Arc<dyn DetectionSink>, Arc<Mutex<Vec<DetectionEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let sink: Arc<dyn DetectionSink> = Arc::new(move |e: DetectionEvent| captured.lock().unwrap().push(e));
        (sink, events)
    }

    fn granted() -> FakeEnvironment {
        FakeEnvironment {
            permissions: vec![Permission::ReadPhoneState],
            ..FakeEnvironment::default()
        }
    }

    #[test]
    fn test_forwards_every_transition() {
        let telephony = Arc::new(FakeTelephony::default());
        let watcher = CallStateWatcher::new(telephony.clone());
        let (sink, events) = recording_sink();

        assert_eq!(watcher.start(&granted(), sink, None), RegistrationOutcome::Registered);
        telephony.emit(CallState::Ringing, Some("+4930123"));
        telephony.emit(CallState::Ringing, Some("+4930123"));
        telephony.emit(CallState::Idle, None);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            DetectionEvent::CallStateChanged {
                state: CallState::Ringing,
                number: Some("+4930123".to_string())
            }
        );
    }

    #[test]
    fn test_registers_once() {
        let telephony = Arc::new(FakeTelephony::default());
        let watcher = CallStateWatcher::new(telephony.clone());
        let (sink, _) = recording_sink();
        watcher.start(&granted(), Arc::clone(&sink), None);
        watcher.start(&granted(), sink, None);
        assert_eq!(telephony.registrations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_permission_requests_it() {
        let telephony = Arc::new(FakeTelephony::default());
        let watcher = CallStateWatcher::new(telephony.clone());
        let requests = Requests::default();
        let (sink, events) = recording_sink();

        let outcome = watcher.start(&FakeEnvironment::default(), sink, Some(&requests));
        assert_eq!(outcome, RegistrationOutcome::AwaitingPermission);
        assert_eq!(*requests.0.lock().unwrap(), vec![Permission::ReadPhoneState]);
        assert_eq!(telephony.registrations.load(Ordering::SeqCst), 0);
        telephony.emit(CallState::Ringing, None);
        assert!(events.lock().unwrap().is_empty());

        assert_eq!(watcher.on_permission_granted(Permission::AccessFineLocation), None);
        assert_eq!(
            watcher.on_permission_granted(Permission::ReadPhoneState),
            Some(RegistrationOutcome::Registered)
        );
        assert_eq!(watcher.on_permission_granted(Permission::ReadPhoneState), None);
        telephony.emit(CallState::OffHook, None);
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let telephony = Arc::new(FakeTelephony::default());
        let watcher = CallStateWatcher::new(telephony.clone());
        watcher.stop();
        let (sink, _) = recording_sink();
        watcher.start(&granted(), sink, None);
        watcher.stop();
        watcher.stop();
        assert_eq!(telephony.unregistrations.load(Ordering::SeqCst), 1);
        assert_eq!(watcher.state(), ActivationState::Inactive);
    }

    #[test]
    fn test_unsupported_telephony() {
        let watcher = CallStateWatcher::new(Arc::new(crate::host::Unsupported));
        let (sink, _) = recording_sink();
        assert_eq!(watcher.start(&granted(), sink, None), RegistrationOutcome::Unavailable);
        assert_eq!(watcher.state(), ActivationState::Inactive);
    }
}
