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

use crate::error::RoutineError;
use crate::time::FrameTime;
use std::fmt;

/// A suspendable unit of work driven by a [`RoutineHandle`](super::RoutineHandle).
///
/// A unit becomes active when its handle advances to it: [`execute`](Self::execute)
/// is then called exactly once, followed by zero or more calls to
/// [`tick`](Self::tick), one per frame, for as long as [`is_done`](Self::is_done)
/// returns `false`. Once done, the unit is never called again and is dropped
/// when the handle moves on.
///
/// Completion is one-way: a unit must not go back to "not done".
pub trait Routine {
    /// Starts the unit. May complete it immediately.
    fn execute(&mut self) -> Result<(), RoutineError>;

    /// Advances the unit by one frame.
    fn tick(&mut self, _time: &FrameTime) -> Result<(), RoutineError> {
        Ok(())
    }

    /// Whether the unit has finished.
    fn is_done(&self) -> bool;

    /// A short name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An item produced by a coroutine's producer.
///
/// A producer is any iterator of `Yield` (or of `Result<Yield, RoutineError>`
/// for producers that can fail). Each item is pulled only once the previous
/// unit is done.
pub enum Yield {
    /// A unit to execute and tick until done.
    Routine(Box<dyn Routine>),
    /// A placeholder consumed without calling anything; it costs exactly one tick.
    Skip,
}

impl Yield {
    /// Boxes any unit into a `Yield`.
    pub fn routine<R: Routine + 'static>(routine: R) -> Self {
        Yield::Routine(Box::new(routine))
    }

    /// Whether this item is the [`Skip`](Yield::Skip) placeholder.
    pub fn is_skip(&self) -> bool {
        matches!(self, Yield::Skip)
    }
}

impl fmt::Debug for Yield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Yield::Routine(routine) => f.debug_tuple("Routine").field(&routine.name()).finish(),
            Yield::Skip => write!(f, "Skip"),
        }
    }
}

impl From<Box<dyn Routine>> for Yield {
    fn from(routine: Box<dyn Routine>) -> Self {
        Yield::Routine(routine)
    }
}
