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

//! Lightweight timing primitives used to produce [`FrameTime`]s.

use crate::time::FrameTime;
use std::time::{Duration, Instant};

/// A monotonic stopwatch measuring wall time since its last (re)start.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Creates a new, running Stopwatch.
    /// ## Returns
    /// A new instance of the Stopwatch struct.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Returns the elapsed time since the stopwatch was started.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the elapsed time in seconds as f64.
    #[inline]
    pub fn elapsed_secs_f64(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Restarts the stopwatch and returns the time measured before the restart.
    /// ## Returns
    /// The duration of the lap that just ended.
    #[inline]
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now.saturating_duration_since(self.start_time);
        self.start_time = now;
        lap
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces successive [`FrameTime`]s for a host loop.
///
/// The clock accumulates the total game time and flags a frame as running
/// slowly when its delta exceeds the target frame duration. Use
/// [`tick`](Self::tick) in a real-time loop and [`advance`](Self::advance) for
/// deterministic, offline stepping.
#[derive(Debug, Clone)]
pub struct FrameClock {
    stopwatch: Stopwatch,
    total: Duration,
    target_frame_time: Option<Duration>,
    frames: u64,
}

impl FrameClock {
    /// Creates a clock with an optional target frame duration.
    pub fn new(target_frame_time: Option<Duration>) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            total: Duration::ZERO,
            target_frame_time,
            frames: 0,
        }
    }

    /// Creates a clock targeting `frames_per_second` frames per second.
    ///
    /// A rate of zero means "no target": no frame is ever flagged as slow.
    pub fn with_target_rate(frames_per_second: u32) -> Self {
        let target = (frames_per_second > 0)
            .then(|| Duration::from_secs_f64(1.0 / f64::from(frames_per_second)));
        Self::new(target)
    }

    /// Measures the wall time since the previous call and returns the new frame.
    pub fn tick(&mut self) -> FrameTime {
        let delta = self.stopwatch.lap();
        self.advance(delta)
    }

    /// Advances the clock by `delta` without looking at the wall clock.
    pub fn advance(&mut self, delta: Duration) -> FrameTime {
        self.total = self.total.saturating_add(delta);
        self.frames += 1;
        let running_slowly = self
            .target_frame_time
            .is_some_and(|target| delta > target);
        if running_slowly {
            log::trace!(
                "Frame {} ran slow: {:?} > {:?}",
                self.frames,
                delta,
                self.target_frame_time
            );
        }
        FrameTime::new(self.total, delta, running_slowly)
    }

    /// Wall time since the last [`tick`](Self::tick), or since creation.
    pub fn since_last_tick(&self) -> Duration {
        self.stopwatch.elapsed()
    }

    /// Total time accumulated so far.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of frames produced so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// The target frame duration, if any.
    pub fn target_frame_time(&self) -> Option<Duration> {
        self.target_frame_time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SLEEP_DURATION_MS: u64 = 30;
    const SLEEP_MARGIN_MS: u64 = 200;

    #[test]
    fn stopwatch_lap_measures_and_restarts() {
        let mut watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));

        let lap = watch.lap();
        assert!(
            lap >= Duration::from_millis(SLEEP_DURATION_MS),
            "Lap ({lap:?}) should be >= sleep duration"
        );
        assert!(
            lap < Duration::from_millis(SLEEP_DURATION_MS + SLEEP_MARGIN_MS),
            "Lap ({lap:?}) should be < sleep duration + margin"
        );
        // Restarted: the next reading starts from the lap boundary.
        assert!(watch.elapsed() < lap);
    }

    #[test]
    fn advance_accumulates_total() {
        let mut clock = FrameClock::default();
        clock.advance(Duration::from_millis(10));
        let time = clock.advance(Duration::from_millis(15));

        assert_eq!(time.elapsed(), Duration::from_millis(15));
        assert_eq!(time.total(), Duration::from_millis(25));
        assert_eq!(clock.frame_count(), 2);
        assert_eq!(clock.total(), Duration::from_millis(25));
    }

    #[test]
    fn slow_frames_are_flagged_against_target() {
        let mut clock = FrameClock::new(Some(Duration::from_millis(16)));
        assert!(!clock.advance(Duration::from_millis(16)).is_running_slowly());
        assert!(clock.advance(Duration::from_millis(40)).is_running_slowly());
    }

    #[test]
    fn zero_rate_has_no_target() {
        let mut clock = FrameClock::with_target_rate(0);
        assert_eq!(clock.target_frame_time(), None);
        assert!(!clock.advance(Duration::from_secs(5)).is_running_slowly());
    }

    #[test]
    fn target_rate_is_converted_to_frame_time() {
        let clock = FrameClock::with_target_rate(50);
        assert_eq!(clock.target_frame_time(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn tick_uses_wall_time() {
        let mut clock = FrameClock::default();
        thread::sleep(Duration::from_millis(SLEEP_DURATION_MS));
        let time = clock.tick();
        assert!(time.elapsed() >= Duration::from_millis(SLEEP_DURATION_MS));
        assert_eq!(time.total(), time.elapsed());
    }
}
