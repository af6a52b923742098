// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Detection scheduler.
//!
//! A [`MonitorSession`] owns one periodic detection loop and one secure-flag
//! poll, both spawned on an application-scoped tokio runtime. Starting an
//! already running session is a no-op; stopping cancels the sleeps
//! promptly and lets an in-flight tick finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::activation::Permission;
use crate::call_state::{CallStateWatcher, RegistrationOutcome};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::event::{DetectionEvent, DetectionSink};
use crate::foreground::{ForegroundSlot, LifecycleEvent};
use crate::host::{
    DeviceEnvironment, LocationSource, PermissionRequester, SensorService, TelephonyService,
    Unsupported, WindowHandle,
};
use crate::location::LocationGuard;
use crate::probes::{self, ProbeContext, ProbeKind, SecureFlagTransition, SecureFlagWatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// State shared with the spawned tasks.
struct Shared {
    probes: Arc<ProbeContext>,
    probe_timeout: Duration,
    secure_flag_poll: Duration,
    secure_flag: SecureFlagWatcher,
    ticks: AtomicU64,
}

impl Shared {
    async fn run_tick(&self, sink: &dyn DetectionSink) {
        for kind in ProbeKind::ALL {
            if probes::run_isolated(kind, Arc::clone(&self.probes), self.probe_timeout).await {
                sink.handle(kind.event());
            }
        }
        let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(tick, "detection tick completed");
    }

    fn poll_secure_flag(&self, sink: &dyn DetectionSink) {
        let secure = self.probes.foreground.current().and_then(|window| {
            match probes::secure_flag::is_window_secure(window.as_ref()) {
                Ok(secure) => Some(secure),
                Err(e) => {
                    debug!(error = %e, "window flags unavailable");
                    None
                }
            }
        });
        match self.secure_flag.observe(secure) {
            Some(SecureFlagTransition::Disabled) => sink.handle(DetectionEvent::SecureFlagDisabled),
            Some(SecureFlagTransition::Restored) => info!("FLAG_SECURE restored on foreground window"),
            None => {}
        }
    }
}

pub struct MonitorSession {
    shared: Arc<Shared>,
    runtime: Option<Handle>,
    sensors: Arc<dyn SensorService>,
    call_watcher: CallStateWatcher,
    requester: Option<Arc<dyn PermissionRequester>>,
    config: MonitorConfig,
    /// Held for the whole of `start` and `stop`.
    lifecycle: Mutex<()>,
    running: Mutex<Option<CancellationToken>>,
}

pub struct MonitorSessionBuilder {
    env: Arc<dyn DeviceEnvironment>,
    config: MonitorConfig,
    runtime: Option<Handle>,
    telephony: Option<Arc<dyn TelephonyService>>,
    sensors: Option<Arc<dyn SensorService>>,
    location_source: Option<Arc<dyn LocationSource>>,
    requester: Option<Arc<dyn PermissionRequester>>,
}

impl MonitorSessionBuilder {
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime the loops are spawned on. Defaults to the runtime
    /// `start` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn telephony(mut self, telephony: Arc<dyn TelephonyService>) -> Self {
        self.telephony = Some(telephony);
        self
    }

    pub fn sensors(mut self, sensors: Arc<dyn SensorService>) -> Self {
        self.sensors = Some(sensors);
        self
    }

    pub fn location_source(mut self, source: Arc<dyn LocationSource>) -> Self {
        self.location_source = Some(source);
        self
    }

    pub fn permission_requester(mut self, requester: Arc<dyn PermissionRequester>) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn build(self) -> Result<MonitorSession> {
        let config = self.config.validated()?;
        let policy = Arc::new(config.policy.clone());
        let location = Arc::new(LocationGuard::new(Arc::clone(&policy), config.motion));
        let probes = Arc::new(ProbeContext {
            env: self.env,
            policy,
            foreground: Arc::new(ForegroundSlot::new()),
            location,
            location_source: self.location_source,
        });
        let shared = Arc::new(Shared {
            probes,
            probe_timeout: config.probe_timeout(),
            secure_flag_poll: config.secure_flag_poll(),
            secure_flag: SecureFlagWatcher::new(),
            ticks: AtomicU64::new(0),
        });
        let telephony = self.telephony.unwrap_or_else(|| Arc::new(Unsupported));
        Ok(MonitorSession {
            shared,
            runtime: self.runtime,
            sensors: self.sensors.unwrap_or_else(|| Arc::new(Unsupported)),
            call_watcher: CallStateWatcher::new(telephony),
            requester: self.requester,
            config,
            lifecycle: Mutex::new(()),
            running: Mutex::new(None),
        })
    }
}

impl MonitorSession {
    pub fn builder(env: Arc<dyn DeviceEnvironment>) -> MonitorSessionBuilder {
        MonitorSessionBuilder {
            env,
            config: MonitorConfig::default(),
            runtime: None,
            telephony: None,
            sensors: None,
            location_source: None,
            requester: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn foreground(&self) -> &Arc<ForegroundSlot> {
        &self.shared.probes.foreground
    }

    pub fn location_guard(&self) -> &Arc<LocationGuard> {
        &self.shared.probes.location
    }

    pub fn call_watcher(&self) -> &CallStateWatcher {
        &self.call_watcher
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Ticks completed since the session was built, across restarts.
    pub fn ticks_completed(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    /// Starts detection with ticks every `interval`; the first tick runs
    /// immediately. Fails only when there is no runtime to spawn on.
    pub fn start(&self, interval: Duration, sink: Arc<dyn DetectionSink>) -> Result<StartOutcome> {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_running() {
            debug!("monitor already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| MonitorError::NoRuntime)?,
        };
        let cancel = CancellationToken::new();
        *self.running.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel.clone());

        // `running` is released here: the requester may report a grant
        // before `call_watcher.start` returns.
        let outcome = self.call_watcher.start(
            self.shared.probes.env.as_ref(),
            Arc::clone(&sink),
            self.requester.as_deref(),
        );
        debug!(?outcome, "call state watcher");
        self.shared
            .probes
            .location
            .motion()
            .start_monitoring(self.sensors.as_ref());

        runtime.spawn(tick_loop(
            Arc::clone(&self.shared),
            Arc::clone(&sink),
            interval,
            cancel.clone(),
        ));
        runtime.spawn(secure_flag_loop(Arc::clone(&self.shared), sink, cancel));
        info!(?interval, "integrity monitor started");
        Ok(StartOutcome::Started)
    }

    /// Cancels the loops and releases the platform listeners. Safe when
    /// not running.
    pub fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        let Some(cancel) = self.running.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };
        cancel.cancel();
        self.call_watcher.stop();
        self.shared
            .probes
            .location
            .motion()
            .stop_monitoring(self.sensors.as_ref());
        self.shared.probes.location.reset();
        self.shared.secure_flag.reset();
        info!("integrity monitor stopped");
    }

    /// Evaluates every probe once on the caller's task.
    pub async fn run_tick_once(&self, sink: &dyn DetectionSink) {
        self.shared.run_tick(sink).await;
    }

    /// Tracks the foreground window. A destroyed window stops detection.
    pub fn on_lifecycle(&self, event: LifecycleEvent, window: &Arc<dyn WindowHandle>) {
        match event {
            LifecycleEvent::Started | LifecycleEvent::Resumed => self.foreground().set(window),
            LifecycleEvent::Paused => {}
            LifecycleEvent::Destroyed => {
                self.stop();
                self.foreground().clear_if(window);
            }
        }
    }

    /// Grant result reported by the host UI. Denials keep the feature
    /// waiting and are not reported anywhere. Grants while stopped are
    /// ignored.
    pub fn on_permission_result(&self, permission: Permission, granted: bool) {
        if !granted {
            debug!(permission = permission.manifest_name(), "permission denied");
            return;
        }
        // held across registration so a concurrent `stop` tears it down
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_none() {
            return;
        }
        if let Some(RegistrationOutcome::Registered) = self.call_watcher.on_permission_granted(permission) {
            info!(permission = permission.manifest_name(), "gated feature activated");
        }
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(
    shared: Arc<Shared>,
    sink: Arc<dyn DetectionSink>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        shared.run_tick(sink.as_ref()).await;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!("detection loop exited");
}

async fn secure_flag_loop(shared: Arc<Shared>, sink: Arc<dyn DetectionSink>, cancel: CancellationToken) {
    loop {
        shared.poll_secure_flag(sink.as_ref());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(shared.secure_flag_poll) => {}
        }
    }
    debug!("secure flag poll exited");
}
