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

//! # Cadence Core
//!
//! A frame-driven cooperative coroutine scheduler. Long-running game logic is
//! written as a lazy sequence of suspension points (waits, actions, custom
//! units) and advanced exactly once per frame by the host loop, without
//! threads or preemption.

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod coroutine;
pub mod diagnostics;
pub mod error;
pub mod system;
pub mod time;

pub use clock::{FrameClock, Stopwatch};
pub use config::{CompactionPolicy, SchedulerConfig};
pub use coroutine::{
    Call, CoroutineScheduler, Coroutines, FaultOrigin, HandleId, HandleState, Routine,
    RoutineFault, RoutineHandle, Spawner, TickReport, Wait, WaitFrames, WaitUntil, Yield,
};
pub use diagnostics::{DiagnosticsBus, SchedulerEvent};
pub use error::{ConfigError, RoutineError};
pub use system::FrameSystem;
pub use time::FrameTime;
