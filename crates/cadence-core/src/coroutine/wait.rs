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

//! Units that suspend a coroutine for an amount of game time or frames.

use super::routine::{Routine, Yield};
use crate::error::RoutineError;
use crate::time::FrameTime;
use std::time::Duration;

/// Pauses a coroutine for a fixed interval of game time.
///
/// Elapsed time is accumulated from each frame's delta as a [`Duration`], so
/// no rounding drift builds up over many frames. The wait completes on the
/// first tick at which the accumulated time reaches the interval; a zero
/// interval therefore completes on the very next tick, never during
/// [`execute`](Routine::execute).
///
/// # Example
///
/// ```rust
/// use cadence_core::{FrameTime, Routine, Wait};
///
/// let mut wait = Wait::seconds(1.5).unwrap();
/// wait.execute().unwrap();
/// wait.tick(&FrameTime::from_secs(1.0)).unwrap();
/// assert!(!wait.is_done());
/// wait.tick(&FrameTime::from_secs(0.5)).unwrap();
/// assert!(wait.is_done());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wait {
    interval: Duration,
    elapsed: Duration,
    done: bool,
}

impl Wait {
    /// Waits for `interval` of game time.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            done: false,
        }
    }

    /// Waits until the next frame.
    pub const fn next_tick() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Waits for `seconds` of game time.
    ///
    /// Returns [`RoutineError::InvalidDuration`] for negative, NaN, infinite or
    /// otherwise unrepresentable values.
    pub fn seconds(seconds: f64) -> Result<Self, RoutineError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(RoutineError::InvalidDuration { seconds });
        }
        let interval = Duration::try_from_secs_f64(seconds)
            .map_err(|_| RoutineError::InvalidDuration { seconds })?;
        Ok(Self::new(interval))
    }

    /// Waits for `millis` milliseconds of game time.
    pub const fn millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Game time accumulated since the wait was executed.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Game time left before the wait completes.
    pub fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.elapsed)
    }
}

impl Routine for Wait {
    fn execute(&mut self) -> Result<(), RoutineError> {
        self.elapsed = Duration::ZERO;
        self.done = false;
        Ok(())
    }

    fn tick(&mut self, time: &FrameTime) -> Result<(), RoutineError> {
        if self.done {
            return Ok(());
        }
        self.elapsed = self.elapsed.saturating_add(time.elapsed());
        if self.elapsed >= self.interval {
            self.done = true;
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn name(&self) -> &str {
        "Wait"
    }
}

impl From<Wait> for Yield {
    fn from(wait: Wait) -> Self {
        Yield::routine(wait)
    }
}

/// Pauses a coroutine for a number of frames, whatever their length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitFrames {
    frames: u32,
    counted: u32,
}

impl WaitFrames {
    /// Waits for `frames` ticks. Zero behaves like [`Wait::next_tick`].
    pub const fn new(frames: u32) -> Self {
        Self { frames, counted: 0 }
    }

    /// Frames left before the wait completes.
    pub fn remaining(&self) -> u32 {
        self.frames.saturating_sub(self.counted)
    }
}

impl Routine for WaitFrames {
    fn execute(&mut self) -> Result<(), RoutineError> {
        self.counted = 0;
        Ok(())
    }

    fn tick(&mut self, _time: &FrameTime) -> Result<(), RoutineError> {
        self.counted = self.counted.saturating_add(1);
        Ok(())
    }

    fn is_done(&self) -> bool {
        // At least one tick, even for zero frames.
        self.counted > 0 && self.counted >= self.frames
    }

    fn name(&self) -> &str {
        "WaitFrames"
    }
}

impl From<WaitFrames> for Yield {
    fn from(wait: WaitFrames) -> Self {
        Yield::routine(wait)
    }
}
