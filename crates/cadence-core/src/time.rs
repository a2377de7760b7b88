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

//! Per-frame timing record handed to every tick.

use std::fmt;
use std::time::Duration;

/// The timing statistics of the current frame.
///
/// A `FrameTime` is produced once per frame by the host loop (usually through
/// a [`FrameClock`](crate::FrameClock)) and passed down to the scheduler and
/// every active step unit. The scheduler itself only reads [`elapsed`](Self::elapsed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTime {
    total: Duration,
    elapsed: Duration,
    running_slowly: bool,
}

impl FrameTime {
    /// A frame with no elapsed time at the very start of the game.
    pub const ZERO: FrameTime = FrameTime {
        total: Duration::ZERO,
        elapsed: Duration::ZERO,
        running_slowly: false,
    };

    /// Creates a new frame record.
    ///
    /// ## Arguments
    /// * `total` - Time accumulated since the game started, this frame included.
    /// * `elapsed` - Time elapsed since the previous frame.
    /// * `running_slowly` - Whether this frame took longer than the target frame time.
    pub const fn new(total: Duration, elapsed: Duration, running_slowly: bool) -> Self {
        Self {
            total,
            elapsed,
            running_slowly,
        }
    }

    /// A frame of length `elapsed` that is also the first frame of the game.
    ///
    /// Handy for tests and offline stepping where only the delta matters.
    pub const fn from_delta(elapsed: Duration) -> Self {
        Self::new(elapsed, elapsed, false)
    }

    /// Same as [`from_delta`](Self::from_delta), expressed in seconds.
    ///
    /// Negative or non-finite values are clamped to zero.
    pub fn from_secs(seconds: f64) -> Self {
        Self::from_delta(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO))
    }

    /// Returns [`FrameTime::ZERO`].
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// How much time elapsed during the last frame.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// How much time elapsed since the game started.
    #[inline]
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Total game time in seconds.
    #[inline]
    pub fn total_secs(&self) -> f32 {
        self.total.as_secs_f32()
    }

    /// Total game time in milliseconds.
    #[inline]
    pub fn total_millis(&self) -> f32 {
        self.total.as_secs_f32() * 1000.0
    }

    /// Whether the last frame took longer than the target frame time.
    #[inline]
    pub fn is_running_slowly(&self) -> bool {
        self.running_slowly
    }
}

impl fmt::Display for FrameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Elapsed Frame Time: {:.3}ms, Total Game Time: {:?}, Last Update Ran Slow: {}",
            self.elapsed.as_secs_f64() * 1000.0,
            self.total,
            self.running_slowly
        )
    }
}
