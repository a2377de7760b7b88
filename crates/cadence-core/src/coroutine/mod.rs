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

//! Cooperative, frame-driven coroutines.
//!
//! A coroutine is a lazy producer of [`Yield`] items. Each [`Routine`] it
//! yields is a suspension point: the owning [`RoutineHandle`] executes it,
//! ticks it once per frame until it reports done, and only then pulls the
//! next item. The [`CoroutineScheduler`] owns every handle and ticks them all,
//! in submission order, once per external frame.
//!
//! Nothing here is threaded or preemptive. Suspension only happens between
//! ticks, when a unit returns from `tick` without having completed.
//!
//! ```text
//! host loop ─▶ CoroutineScheduler::tick(time)
//!                 └─▶ RoutineHandle::tick(time)   (each handle, in order)
//!                        ├─▶ Routine::tick(time)  (unit still running)
//!                        └─▶ producer.next() ─▶ Routine::execute()
//! ```

mod action;
mod handle;
mod routine;
mod scheduler;
mod wait;

pub use self::action::{Call, WaitUntil};
pub use self::handle::{
    fallible_producer, producer, FaultOrigin, HandleId, HandleState, Producer, RoutineFault,
    RoutineHandle,
};
pub use self::routine::{Routine, Yield};
pub use self::scheduler::{CoroutineScheduler, Coroutines, Spawner, TickReport};
pub use self::wait::{Wait, WaitFrames};
