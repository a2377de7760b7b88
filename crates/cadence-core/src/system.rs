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

//! Hook for systems updated once per frame by a host loop.

use crate::time::FrameTime;

/// A system the host loop updates once per frame.
///
/// The [`CoroutineScheduler`](crate::CoroutineScheduler) implements this trait
/// so it can be driven next to the host's other per-frame systems.
pub trait FrameSystem {
    /// A short, stable name for logs.
    fn name(&self) -> &'static str;

    /// Advances the system by one frame.
    fn update(&mut self, time: &FrameTime);
}
