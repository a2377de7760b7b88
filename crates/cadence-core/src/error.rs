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

//! Defines the error types shared by step units, producers and configuration.

use thiserror::Error;

/// An error raised by a step unit, by a producer, or while building a unit.
#[derive(Debug, Error)]
pub enum RoutineError {
    /// A wait was requested with a negative, NaN or unrepresentable duration.
    #[error("invalid wait duration: {seconds} seconds (expected a finite, non-negative value)")]
    InvalidDuration {
        /// The rejected value, in seconds.
        seconds: f64,
    },
    /// A unit or producer failed with a plain message.
    #[error("routine failed: {0}")]
    Failed(String),
    /// A unit or producer forwarded an arbitrary error.
    #[error(transparent)]
    Custom(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RoutineError {
    /// Convenience constructor for a failure described by a message.
    pub fn failed(message: impl Into<String>) -> Self {
        RoutineError::Failed(message.into())
    }

    /// Wraps any error type so it can be returned from a unit.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RoutineError::Custom(Box::new(error))
    }
}

/// An error found while loading or validating a [`SchedulerConfig`](crate::SchedulerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `CompactionPolicy::EveryTicks(0)` would never fire.
    #[error("compaction interval must be at least one tick")]
    ZeroCompactionInterval,
    /// A bounded diagnostics channel needs room for at least one event.
    #[error("diagnostics channel capacity must be non-zero")]
    ZeroDiagnosticsCapacity,
    /// The periodic summary interval must be at least one tick.
    #[error("summary interval must be at least one tick")]
    ZeroSummaryInterval,
    /// The configuration text could not be parsed.
    #[error("failed to parse scheduler configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
