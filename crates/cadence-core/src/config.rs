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

//! Scheduler configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// When exhausted handles are removed from the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionPolicy {
    /// Exhausted handles are kept until [`compact`](crate::CoroutineScheduler::compact) is called.
    Never,
    /// Exhausted handles are removed on every submission.
    OnSubmit,
    /// Exhausted handles are removed after every `n`-th tick.
    EveryTicks(u32),
}

/// Configuration for the [`CoroutineScheduler`](crate::CoroutineScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How exhausted handles are purged.
    pub compaction: CompactionPolicy,
    /// Capacity of the diagnostics channel.
    /// `None` makes it unbounded; when a bounded channel is full, new events are dropped.
    pub diagnostics_capacity: Option<usize>,
    /// Emit a `debug!` summary of the schedule every `n` ticks.
    pub log_summary_every_ticks: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            compaction: CompactionPolicy::EveryTicks(60),
            diagnostics_capacity: Some(1024),
            log_summary_every_ticks: None,
        }
    }
}

impl SchedulerConfig {
    /// Parses a configuration from JSON and validates it.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: SchedulerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every interval and capacity is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compaction == CompactionPolicy::EveryTicks(0) {
            return Err(ConfigError::ZeroCompactionInterval);
        }
        if self.diagnostics_capacity == Some(0) {
            return Err(ConfigError::ZeroDiagnosticsCapacity);
        }
        if self.log_summary_every_ticks == Some(0) {
            return Err(ConfigError::ZeroSummaryInterval);
        }
        Ok(())
    }
}
