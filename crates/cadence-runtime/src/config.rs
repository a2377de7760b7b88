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

//! Runtime settings, loaded from an optional JSON file.

use anyhow::{bail, Context, Result};
use cadence_core::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for the host loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Frames per second the loop tries to hold.
    pub target_fps: u32,
    /// Stop after this many frames. `None` runs until the scheduler is idle.
    pub max_frames: Option<u64>,
    /// Settings forwarded to the scheduler.
    pub scheduler: SchedulerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_frames: Some(600),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads the config at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
                Self::from_json_str(&text)
                    .with_context(|| format!("Invalid config file '{}'", path.display()))?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: RuntimeConfig =
            serde_json::from_str(text).context("Failed to parse runtime config")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 {
            bail!("target_fps must be greater than zero");
        }
        self.scheduler
            .validate()
            .context("Invalid scheduler settings")?;
        Ok(())
    }

    /// Wall-clock budget of a single frame.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }
}
