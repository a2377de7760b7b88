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

//! The frame-driven scheduler owning every coroutine.

use super::handle::{
    fallible_producer, producer, HandleId, HandleState, Producer, RoutineFault, RoutineHandle,
};
use super::routine::Yield;
use crate::config::{CompactionPolicy, SchedulerConfig};
use crate::diagnostics::{DiagnosticsBus, SchedulerEvent};
use crate::error::{ConfigError, RoutineError};
use crate::system::FrameSystem;
use crate::time::FrameTime;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Something coroutines can be submitted to.
///
/// Implemented by [`CoroutineScheduler`] and by its [`Spawner`], so code that
/// builds coroutines does not need to know whether it runs inside a tick.
pub trait Coroutines {
    /// Submits a producer whose items may fail.
    fn run_fallible<I>(&mut self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Result<Yield, RoutineError>>,
        I::IntoIter: 'static;

    /// Submits a producer of items.
    fn run<I>(&mut self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Yield>,
        I::IntoIter: 'static,
    {
        self.run_fallible(source.into_iter().map(Ok))
    }
}

struct Pending {
    id: HandleId,
    producer: Producer,
}

/// State shared between the scheduler and its spawners.
#[derive(Default)]
struct SharedQueue {
    next_id: Cell<u64>,
    pending: RefCell<VecDeque<Pending>>,
}

impl SharedQueue {
    fn allocate_id(&self) -> HandleId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        HandleId(id)
    }

    fn is_issued(&self, id: HandleId) -> bool {
        id.0 < self.next_id.get()
    }

    fn push(&self, producer: Producer) -> HandleId {
        let id = self.allocate_id();
        self.pending.borrow_mut().push_back(Pending { id, producer });
        id
    }

    /// Takes every entry queued after the first `skip` ones.
    // The batch is returned so the borrow ends before any of it is started:
    // starting a handle may submit again.
    fn take_from(&self, skip: usize) -> Vec<Pending> {
        let mut pending = self.pending.borrow_mut();
        let skip = skip.min(pending.len());
        pending.drain(skip..).collect()
    }

    // The entry is dropped by the caller, outside the borrow: its producer
    // may own a spawner.
    fn remove(&self, id: HandleId) -> Option<Pending> {
        let mut pending = self.pending.borrow_mut();
        let index = pending.iter().position(|entry| entry.id == id)?;
        pending.remove(index)
    }

    fn contains(&self, id: HandleId) -> bool {
        self.pending.borrow().iter().any(|entry| entry.id == id)
    }

    fn len(&self) -> usize {
        self.pending.borrow().len()
    }
}

/// A cloneable handle for submitting coroutines from inside running units.
///
/// Submissions are queued and spliced into the schedule after the tick in
/// progress has finished iterating (or at the start of the next tick when
/// no tick is running). Submissions made by a coroutine while it is being
/// started are held until the next tick. The id is assigned immediately.
#[derive(Clone)]
pub struct Spawner {
    shared: Rc<SharedQueue>,
}

impl Spawner {
    /// Queues a producer of items.
    pub fn submit<I>(&self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Yield>,
        I::IntoIter: 'static,
    {
        self.shared.push(producer(source))
    }

    /// Queues a producer whose items may fail.
    pub fn submit_fallible<I>(&self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Result<Yield, RoutineError>>,
        I::IntoIter: 'static,
    {
        self.shared.push(fallible_producer(source))
    }

    /// Number of submissions waiting to be spliced in.
    pub fn pending_count(&self) -> usize {
        self.shared.len()
    }
}

impl Coroutines for Spawner {
    fn run_fallible<I>(&mut self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Result<Yield, RoutineError>>,
        I::IntoIter: 'static,
    {
        self.submit_fallible(source)
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner")
            .field("pending", &self.shared.len())
            .finish()
    }
}

/// What happened during one [`CoroutineScheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the tick, starting at zero.
    pub frame: u64,
    /// Number of handles ticked, exhausted ones included.
    pub ticked: usize,
    /// Handles spliced in from the pending queue during this tick.
    pub spliced: Vec<HandleId>,
    /// Handles whose producer ran out during this tick, including handles
    /// spliced in with an empty producer. Aborted handles are listed in
    /// `faults` instead; stopped handles are not reported.
    pub exhausted: Vec<HandleId>,
    /// Faults raised during this tick, or during submissions since the last one.
    pub faults: Vec<RoutineFault>,
    /// Number of exhausted handles purged at the end of this tick.
    pub compacted: usize,
}

impl TickReport {
    /// Whether no coroutine failed.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Drives every submitted coroutine once per frame.
///
/// Handles are ticked in submission order. A failing unit or producer only
/// aborts its own coroutine: the fault is logged, published on the
/// diagnostics channel and returned in the [`TickReport`], and the remaining
/// handles are still ticked in the same frame.
///
/// # Example
///
/// ```rust
/// use cadence_core::{CoroutineScheduler, FrameTime, Wait, Yield};
///
/// let mut scheduler = CoroutineScheduler::new();
/// let id = scheduler.submit([Yield::from(Wait::millis(20))]);
///
/// let frame = FrameTime::from_delta(std::time::Duration::from_millis(10));
/// scheduler.tick(&frame);
/// scheduler.tick(&frame);
/// scheduler.tick(&frame);
/// assert_eq!(scheduler.state(id), Some(cadence_core::HandleState::Exhausted));
/// ```
pub struct CoroutineScheduler {
    config: SchedulerConfig,
    handles: Vec<RoutineHandle>,
    shared: Rc<SharedQueue>,
    diagnostics: DiagnosticsBus<SchedulerEvent>,
    deferred_faults: Vec<RoutineFault>,
    frames: u64,
}

impl CoroutineScheduler {
    /// Creates a scheduler with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(SchedulerConfig::default())
    }

    /// Creates a scheduler after validating `config`.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: SchedulerConfig) -> Self {
        log::info!("CoroutineScheduler initialized ({:?}).", config.compaction);
        Self {
            diagnostics: DiagnosticsBus::with_capacity(config.diagnostics_capacity),
            config,
            handles: Vec::new(),
            shared: Rc::new(SharedQueue::default()),
            deferred_faults: Vec::new(),
            frames: 0,
        }
    }

    /// Submits a producer of items and starts it immediately.
    ///
    /// The first item is pulled and, if it is a unit, executed before this
    /// returns. A fault during that first step is reported by the next tick.
    pub fn submit<I>(&mut self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Yield>,
        I::IntoIter: 'static,
    {
        self.submit_producer(producer(source))
    }

    /// Submits a producer whose items may fail and starts it immediately.
    pub fn submit_fallible<I>(&mut self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Result<Yield, RoutineError>>,
        I::IntoIter: 'static,
    {
        self.submit_producer(fallible_producer(source))
    }

    fn submit_producer(&mut self, producer: Producer) -> HandleId {
        // Earlier spawner submissions keep their place in the tick order.
        let mut scratch = TickReport::default();
        let queued = self.shared.take_from(0);
        self.splice(queued, &mut scratch);

        let id = self.shared.allocate_id();
        if let Err(fault) = self.start_handle(id, producer) {
            scratch.faults.push(fault);
        }
        self.deferred_faults.extend(scratch.faults);

        if self.config.compaction == CompactionPolicy::OnSubmit {
            self.compact();
        }
        id
    }

    fn start_handle(
        &mut self,
        id: HandleId,
        producer: Producer,
    ) -> Result<HandleState, RoutineFault> {
        let mut handle = RoutineHandle::new(id, producer);
        let started = handle.start();
        log::debug!("Coroutine {id} started.");
        self.diagnostics.publish(SchedulerEvent::Started { id });

        if let Err(fault) = &started {
            self.diagnostics.publish(SchedulerEvent::Faulted(fault.clone()));
        } else if handle.is_exhausted() {
            self.diagnostics.publish(SchedulerEvent::Exhausted { id });
        }
        let state = handle.state();

        // Submissions deferred by a splice may carry lower ids than handles
        // started after them.
        let index = self.handles.partition_point(|existing| existing.id() < id);
        self.handles.insert(index, handle);
        started.map(|()| state)
    }

    /// Starts a batch taken from the queue. Whatever those handles submit
    /// while starting stays queued.
    fn splice(&mut self, batch: Vec<Pending>, report: &mut TickReport) {
        for Pending { id, producer } in batch {
            match self.start_handle(id, producer) {
                Ok(HandleState::Exhausted) => report.exhausted.push(id),
                Ok(HandleState::Active) => {}
                Err(fault) => report.faults.push(fault),
            }
            report.spliced.push(id);
        }
    }

    /// Advances every coroutine by one frame.
    ///
    /// 1. Submissions queued through a [`Spawner`] since the last tick are spliced in.
    /// 2. Every handle is ticked once, in submission order.
    /// 3. Submissions queued while ticking are spliced in and started; they
    ///    receive their first tick on the next frame.
    /// 4. Exhausted handles are compacted according to the configuration.
    ///
    /// Submissions made by a handle while it is being started wait for the
    /// next tick, so a coroutine that keeps spawning successors advances one
    /// generation per frame.
    pub fn tick(&mut self, time: &FrameTime) -> TickReport {
        let mut report = TickReport {
            frame: self.frames,
            faults: std::mem::take(&mut self.deferred_faults),
            ..TickReport::default()
        };

        let queued = self.shared.take_from(0);
        self.splice(queued, &mut report);
        let deferred = self.shared.len();

        let diagnostics = &self.diagnostics;
        for handle in self.handles.iter_mut() {
            let was_active = handle.is_active();
            if let Err(fault) = handle.tick(time) {
                diagnostics.publish(SchedulerEvent::Faulted(fault.clone()));
                report.faults.push(fault);
            } else if was_active && handle.is_exhausted() {
                diagnostics.publish(SchedulerEvent::Exhausted { id: handle.id() });
                report.exhausted.push(handle.id());
            }
            report.ticked += 1;
        }

        let submitted = self.shared.take_from(deferred);
        self.splice(submitted, &mut report);

        self.frames += 1;
        if let CompactionPolicy::EveryTicks(interval) = self.config.compaction {
            if self.frames % u64::from(interval) == 0 {
                report.compacted = self.compact();
            }
        }
        if let Some(interval) = self.config.log_summary_every_ticks {
            if self.frames % u64::from(interval) == 0 {
                self.log_summary();
            }
        }

        log::trace!(
            "Tick {}: {} handle(s), {} fault(s).",
            report.frame,
            report.ticked,
            report.faults.len()
        );
        report
    }

    /// Removes exhausted handles. Returns how many were removed.
    ///
    /// Ids of removed handles keep reporting [`HandleState::Exhausted`].
    pub fn compact(&mut self) -> usize {
        let before = self.handles.len();
        self.handles.retain(RoutineHandle::is_active);
        let removed = before - self.handles.len();
        if removed > 0 {
            log::debug!("Compacted {removed} exhausted coroutine(s).");
            self.diagnostics.publish(SchedulerEvent::Compacted { removed });
        }
        removed
    }

    /// Stops a coroutine: its current unit and producer are dropped without
    /// further calls. Works for queued submissions too.
    ///
    /// Returns `false` if the id is unknown or already exhausted.
    pub fn stop(&mut self, id: HandleId) -> bool {
        let stopped = match self.find_mut(id) {
            Some(handle) => handle.stop(),
            None => self.shared.remove(id).is_some(),
        };
        if stopped {
            self.diagnostics.publish(SchedulerEvent::Stopped { id });
        }
        stopped
    }

    /// The state of a coroutine.
    ///
    /// Returns `None` for ids this scheduler never issued. Queued submissions
    /// are `Active`; compacted ones are `Exhausted`.
    pub fn state(&self, id: HandleId) -> Option<HandleState> {
        if !self.shared.is_issued(id) {
            return None;
        }
        if let Some(handle) = self.find(id) {
            return Some(handle.state());
        }
        if self.shared.contains(id) {
            Some(HandleState::Active)
        } else {
            Some(HandleState::Exhausted)
        }
    }

    /// Looks up a retained handle.
    pub fn handle(&self, id: HandleId) -> Option<&RoutineHandle> {
        self.find(id)
    }

    // Handles are kept sorted by id.
    fn find(&self, id: HandleId) -> Option<&RoutineHandle> {
        let index = self
            .handles
            .binary_search_by_key(&id, RoutineHandle::id)
            .ok()?;
        Some(&self.handles[index])
    }

    fn find_mut(&mut self, id: HandleId) -> Option<&mut RoutineHandle> {
        let index = self
            .handles
            .binary_search_by_key(&id, RoutineHandle::id)
            .ok()?;
        Some(&mut self.handles[index])
    }

    /// Returns a spawner sharing this scheduler's submission queue.
    pub fn spawner(&self) -> Spawner {
        Spawner {
            shared: Rc::clone(&self.shared),
        }
    }

    /// The receiving end of the diagnostics channel.
    pub fn events(&self) -> &flume::Receiver<SchedulerEvent> {
        self.diagnostics.receiver()
    }

    /// The scheduler's configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of retained handles, exhausted ones included.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no handle is retained.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of handles that may still run.
    pub fn active_count(&self) -> usize {
        self.handles.iter().filter(|handle| handle.is_active()).count()
    }

    /// Number of spawner submissions not yet spliced in.
    pub fn pending_count(&self) -> usize {
        self.shared.len()
    }

    /// Whether nothing is left to run.
    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0 && self.active_count() == 0
    }

    /// Number of ticks performed so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    fn log_summary(&self) {
        log::debug!(
            "--- Coroutines after {} tick(s): {} active, {} retained, {} pending, {} event(s) dropped ---",
            self.frames,
            self.active_count(),
            self.len(),
            self.pending_count(),
            self.diagnostics.dropped_count()
        );
    }
}

impl Default for CoroutineScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CoroutineScheduler {
    fn drop(&mut self) {
        // Queued producers may own spawners pointing back at the queue.
        let pending = std::mem::take(&mut *self.shared.pending.borrow_mut());
        drop(pending);
    }
}

impl Coroutines for CoroutineScheduler {
    fn run_fallible<I>(&mut self, source: I) -> HandleId
    where
        I: IntoIterator<Item = Result<Yield, RoutineError>>,
        I::IntoIter: 'static,
    {
        self.submit_fallible(source)
    }
}

impl FrameSystem for CoroutineScheduler {
    fn name(&self) -> &'static str {
        "coroutines"
    }

    fn update(&mut self, time: &FrameTime) {
        let report = self.tick(time);
        for fault in &report.faults {
            log::error!("{fault}");
        }
    }
}

impl fmt::Debug for CoroutineScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroutineScheduler")
            .field("config", &self.config)
            .field("handles", &self.handles)
            .field("pending", &self.shared.len())
            .field("frames", &self.frames)
            .finish()
    }
}
