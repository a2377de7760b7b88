// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runs the launch script on a fixed-rate frame loop.
//!
//! Usage: `cadence-runtime [config.json]`. Log verbosity follows `RUST_LOG`.

mod config;
mod demo;

use anyhow::Result;
use cadence_core::{CoroutineScheduler, FrameClock, FrameSystem, SchedulerEvent, TickReport};
use config::RuntimeConfig;
use log::{debug, error, info, warn};
use std::path::PathBuf;

/// Owns the scheduler and the clock, and drives them until the script is done.
struct Runtime {
    config: RuntimeConfig,
    scheduler: CoroutineScheduler,
    clock: FrameClock,
    faults: usize,
}

impl Runtime {
    fn new(config: RuntimeConfig) -> Result<Self> {
        let scheduler = CoroutineScheduler::with_config(config.scheduler.clone())?;
        let clock = FrameClock::with_target_rate(config.target_fps);
        Ok(Self {
            config,
            scheduler,
            clock,
            faults: 0,
        })
    }

    /// Submits the launch script.
    fn setup(&mut self) {
        info!(
            "Setting up runtime: {} fps, frame limit {:?}.",
            self.config.target_fps, self.config.max_frames
        );
        let script = demo::install(&mut self.scheduler, 5);
        debug!(
            "Launch script submitted: countdown {}, tracker {}, telemetry {}.",
            script.countdown, script.tracker, script.telemetry
        );
    }

    /// Runs the frame loop.
    fn run(&mut self) {
        info!("Runtime starting main loop...");
        let budget = self.config.frame_budget();

        loop {
            if self.scheduler.is_idle() {
                info!("All coroutines finished.");
                break;
            }
            if self
                .config
                .max_frames
                .is_some_and(|limit| self.scheduler.frame_count() >= limit)
            {
                warn!(
                    "Frame limit reached with {} coroutine(s) still active.",
                    self.scheduler.active_count()
                );
                break;
            }

            let time = self.clock.tick();
            let report = self.scheduler.tick(&time);
            self.record(&report);
            self.drain_events();

            // Sleep away what is left of this frame's budget.
            if let Some(rest) = budget.checked_sub(self.clock.since_last_tick()) {
                std::thread::sleep(rest);
            }
        }
    }

    fn record(&mut self, report: &TickReport) {
        for fault in &report.faults {
            error!("{fault}");
        }
        self.faults += report.faults.len();
    }

    fn drain_events(&self) {
        for event in self.scheduler.events().try_iter() {
            match event {
                SchedulerEvent::Faulted(_) => {}
                other => debug!("[{}] {other:?}", self.scheduler.name()),
            }
        }
    }

    /// Logs the final summary.
    fn shutdown(&mut self) {
        info!(
            "Shutting down after {} frame(s) ({:?} of game time): {} fault(s), {} coroutine(s) still active.",
            self.scheduler.frame_count(),
            self.clock.total(),
            self.faults,
            self.scheduler.active_count()
        );
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = RuntimeConfig::load(path.as_deref())?;

    let mut runtime = Runtime::new(config)?;
    runtime.setup();
    runtime.run();
    runtime.shutdown();
    Ok(())
}
