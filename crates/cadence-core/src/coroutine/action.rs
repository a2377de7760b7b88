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

//! Closure-backed units: one-shot actions and predicate waits.

use super::routine::{Routine, Yield};
use crate::error::RoutineError;
use crate::time::FrameTime;
use std::fmt;

type Action = Box<dyn FnOnce() -> Result<(), RoutineError>>;
type Predicate = Box<dyn FnMut(&FrameTime) -> bool>;

/// Runs a closure once when executed and completes immediately.
///
/// Because it is done right after [`execute`](Routine::execute), the handle
/// steps past it on the following tick.
pub struct Call {
    action: Option<Action>,
    done: bool,
}

impl Call {
    /// Wraps a fallible action. An error aborts the owning coroutine.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() -> Result<(), RoutineError> + 'static,
    {
        Self {
            action: Some(Box::new(action)),
            done: false,
        }
    }

    /// Wraps an action that cannot fail.
    pub fn action<F>(action: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::new(move || {
            action();
            Ok(())
        })
    }
}

impl Routine for Call {
    fn execute(&mut self) -> Result<(), RoutineError> {
        self.done = true;
        match self.action.take() {
            Some(action) => action(),
            None => Ok(()),
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn name(&self) -> &str {
        "Call"
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("pending", &self.action.is_some())
            .field("done", &self.done)
            .finish()
    }
}

impl From<Call> for Yield {
    fn from(call: Call) -> Self {
        Yield::routine(call)
    }
}

/// Suspends a coroutine until a predicate holds.
///
/// The predicate is polled once per tick with the current frame time; it is
/// not evaluated on [`execute`](Routine::execute), so the wait always lasts at
/// least one tick.
pub struct WaitUntil {
    predicate: Predicate,
    done: bool,
}

impl WaitUntil {
    /// Waits until `predicate` returns `true`.
    pub fn new<F>(predicate: F) -> Self
    where
        F: FnMut(&FrameTime) -> bool + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            done: false,
        }
    }
}

impl Routine for WaitUntil {
    fn execute(&mut self) -> Result<(), RoutineError> {
        self.done = false;
        Ok(())
    }

    fn tick(&mut self, time: &FrameTime) -> Result<(), RoutineError> {
        if !self.done && (self.predicate)(time) {
            self.done = true;
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn name(&self) -> &str {
        "WaitUntil"
    }
}

impl fmt::Debug for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitUntil").field("done", &self.done).finish()
    }
}

impl From<WaitUntil> for Yield {
    fn from(wait: WaitUntil) -> Self {
        Yield::routine(wait)
    }
}
