/*
 *  supervisor.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed-period daemon loop, failure watchdog and the single shutdown path
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::future::Future;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};
use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::display::manager::DisplayManager;
use crate::display::traits::DeviceOpener;
use crate::frame::{build_frame, FrameLayout};
use crate::telemetry::TelemetrySource;

/// Consecutive display failures tolerated before the daemon gives up
pub const WATCHDOG_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Degraded,
    Terminating,
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    WatchdogExhausted,
    Fault,
}

impl ExitReason {
    pub fn exit_code(self) -> i32 {
        match self {
            ExitReason::Signal => 0,
            ExitReason::WatchdogExhausted | ExitReason::Fault => 1,
        }
    }
}

/// Cross-tick consecutive-failure counter.
#[derive(Debug, Clone)]
pub struct Watchdog {
    failures: u32,
    threshold: u32,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(WATCHDOG_THRESHOLD)
    }
}

impl Watchdog {
    pub fn new(threshold: u32) -> Self {
        Self { failures: 0, threshold }
    }

    /// Feed one tick outcome and get the resulting state.
    pub fn record(&mut self, success: bool) -> SupervisorState {
        if success {
            self.failures = 0;
            return SupervisorState::Running;
        }
        self.failures += 1;
        if self.failures >= self.threshold {
            SupervisorState::Terminating
        } else {
            SupervisorState::Degraded
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

/// Lets exactly one caller through, however many paths race for it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownGuard(Arc<AtomicBool>);

impl ShutdownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for the first caller only
    pub fn claim(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_claimed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// SIGINT / SIGTERM / SIGHUP as tokio signal streams.
pub struct TerminationSignals {
    sigint: Signal,
    sigterm: Signal,
    sighup: Signal,
}

impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Resolves on the first termination signal.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {
                info!("SIGINT received. Initiating graceful shutdown.");
            }
            _ = self.sigterm.recv() => {
                info!("SIGTERM received. Initiating graceful shutdown.");
            }
            _ = self.sighup.recv() => {
                info!("SIGHUP received. Initiating graceful shutdown.");
            }
        }
    }
}

/// Drives telemetry -> frame -> display once per refresh interval.
///
/// Whatever ends the loop (signal, watchdog, a panic inside a tick or the
/// supervisor simply being dropped) the manager is shut down exactly once.
pub struct Supervisor<O: DeviceOpener, T: TelemetrySource> {
    manager: DisplayManager<O>,
    telemetry: T,
    layout: FrameLayout,
    refresh: Duration,
    watchdog: Watchdog,
    state: SupervisorState,
    guard: ShutdownGuard,
}

impl<O: DeviceOpener, T: TelemetrySource> Supervisor<O, T> {
    pub fn new(manager: DisplayManager<O>, telemetry: T, layout: FrameLayout) -> Self {
        let refresh = manager.config().refresh_interval();
        Self {
            manager,
            telemetry,
            layout,
            refresh,
            watchdog: Watchdog::default(),
            state: SupervisorState::Running,
            guard: ShutdownGuard::new(),
        }
    }

    pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn manager(&self) -> &DisplayManager<O> {
        &self.manager
    }

    pub fn guard(&self) -> ShutdownGuard {
        self.guard.clone()
    }

    /// One sample, one frame, one draw.
    pub fn tick(&mut self) -> SupervisorState {
        let sample = self.telemetry.sample();
        let frame = build_frame(&sample, &self.layout);
        let shown = self.manager.display_frame(&frame);

        self.state = self.watchdog.record(shown);
        if !shown {
            error!(
                "Display failure ({}/{})",
                self.watchdog.failures(),
                self.watchdog.threshold()
            );
        }
        self.state
    }

    /// Loop until `stop` resolves, the watchdog trips or a tick panics.
    pub async fn run<F>(&mut self, stop: F) -> ExitReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        info!("Monitoring started, refresh every {:?}", self.refresh);

        let reason = loop {
            let started = Instant::now();

            match catch_unwind(AssertUnwindSafe(|| self.tick())) {
                Err(_) => {
                    error!("Unhandled fault inside monitor tick");
                    break ExitReason::Fault;
                }
                Ok(SupervisorState::Terminating) => {
                    error!("Too many consecutive display failures, exiting");
                    break ExitReason::WatchdogExhausted;
                }
                Ok(_) => {}
            }

            // overruns start the next tick straight away
            let pause = self.refresh.saturating_sub(started.elapsed());
            tokio::select! {
                biased;
                _ = &mut stop => break ExitReason::Signal,
                _ = tokio::time::sleep(pause) => {}
            }
        };

        self.state = SupervisorState::Terminating;
        self.shutdown();
        reason
    }

    /// Release the panel. Only the first call does anything.
    pub fn shutdown(&mut self) -> bool {
        if !self.guard.claim() {
            return false;
        }
        info!("Cleaning up display resources");
        self.manager.shutdown();
        info!("Resources released");
        true
    }
}

impl<O: DeviceOpener, T: TelemetrySource> Drop for Supervisor<O, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
