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

//! Diagnostics channel for the scheduler.
//!
//! The scheduler never propagates unit or producer faults into its tick loop.
//! Instead it publishes [`SchedulerEvent`]s on a [`DiagnosticsBus`], a thin
//! wrapper around a `flume` channel that the host can drain at its own pace.

use crate::coroutine::{HandleId, RoutineFault};
use flume::TrySendError;
use std::sync::atomic::{AtomicU64, Ordering};

/// A lifecycle or fault notification emitted by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A handle was created and its first step performed.
    Started {
        /// The new handle.
        id: HandleId,
    },
    /// A handle's producer ran out of items.
    Exhausted {
        /// The finished handle.
        id: HandleId,
    },
    /// A handle was stopped by its owner before running out of items.
    Stopped {
        /// The stopped handle.
        id: HandleId,
    },
    /// A unit or producer failed; the handle has been aborted.
    Faulted(RoutineFault),
    /// Exhausted handles were purged from the schedule.
    Compacted {
        /// How many handles were removed.
        removed: usize,
    },
}

/// A channel carrying diagnostics events of type `T`.
///
/// The bus owns both ends of the channel. Publishing never blocks: when a
/// bounded channel is full the event is dropped and counted.
#[derive(Debug)]
pub struct DiagnosticsBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
    dropped: AtomicU64,
}

impl<T: Send + 'static> DiagnosticsBus<T> {
    /// Creates a bus backed by an unbounded channel.
    pub fn unbounded() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self::from_channel(sender, receiver)
    }

    /// Creates a bus backed by a channel holding at most `capacity` events.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        Self::from_channel(sender, receiver)
    }

    /// Creates a bounded bus for `Some(capacity)` and an unbounded one for `None`.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    fn from_channel(sender: flume::Sender<T>, receiver: flume::Receiver<T>) -> Self {
        log::debug!("DiagnosticsBus initialized (capacity: {:?}).", sender.capacity());
        Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
        }
    }

    /// Publishes an event without blocking.
    ///
    /// ## Arguments
    /// * `event` - The event to be sent over the channel.
    pub fn publish(&self, event: T) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 {
                    log::warn!("Diagnostics channel is full; dropping events until it is drained.");
                } else {
                    log::trace!("Diagnostics event dropped ({dropped} so far).");
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("Failed to publish diagnostics event: receiver disconnected.");
            }
        }
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Number of events dropped because the channel was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T: Send + 'static> Default for DiagnosticsBus<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
