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

//! The per-coroutine driver pulling units from a lazy producer.

use super::routine::{Routine, Yield};
use crate::error::RoutineError;
use crate::time::FrameTime;
use std::fmt;

/// A boxed, possibly infinite producer of coroutine items.
pub type Producer = Box<dyn Iterator<Item = Result<Yield, RoutineError>>>;

/// Boxes an infallible item source into a [`Producer`].
pub fn producer<I>(source: I) -> Producer
where
    I: IntoIterator<Item = Yield>,
    I::IntoIter: 'static,
{
    Box::new(source.into_iter().map(Ok))
}

/// Boxes a fallible item source into a [`Producer`].
pub fn fallible_producer<I>(source: I) -> Producer
where
    I: IntoIterator<Item = Result<Yield, RoutineError>>,
    I::IntoIter: 'static,
{
    Box::new(source.into_iter())
}

/// Opaque identifier of a submitted coroutine.
///
/// Ids are issued in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) u64);

impl HandleId {
    /// The raw numeric value, for logs and external bookkeeping.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two states of a [`RoutineHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// The producer may still yield items.
    Active,
    /// The producer is finished, failed, or was stopped. Ticking is a no-op.
    Exhausted,
}

/// Where a fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOrigin {
    /// The producer itself yielded an error.
    Producer,
    /// A unit failed while being executed.
    Execute,
    /// A unit failed while being ticked.
    Tick,
}

impl fmt::Display for FaultOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultOrigin::Producer => write!(f, "producer"),
            FaultOrigin::Execute => write!(f, "execute"),
            FaultOrigin::Tick => write!(f, "tick"),
        }
    }
}

/// A failure that aborted one coroutine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineFault {
    /// The aborted handle.
    pub handle: HandleId,
    /// Which call failed.
    pub origin: FaultOrigin,
    /// Name of the failing unit, when a unit failed.
    pub unit: Option<String>,
    /// The rendered error.
    pub message: String,
}

impl fmt::Display for RoutineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(
                f,
                "coroutine {} aborted in {} of '{}': {}",
                self.handle, self.origin, unit, self.message
            ),
            None => write!(
                f,
                "coroutine {} aborted by its {}: {}",
                self.handle, self.origin, self.message
            ),
        }
    }
}

impl std::error::Error for RoutineFault {}

/// Drives one coroutine: a lazy producer and at most one active unit.
///
/// The producer is only pulled when the current unit is done (or absent), so
/// the units of one coroutine run strictly one after the other. A handle is
/// either `Active` or `Exhausted`; once exhausted it never becomes active again.
///
/// ```text
///            start / tick with no current unit, or a done one
///   Active ─────────────────────────────────────────────────▶ step
///     ▲  │ tick with a running unit                            │
///     │  └──▶ unit.tick(time)                                  │
///     │                                                        ▼
///     └──── Routine: execute() ◀── next() ──▶ None / Err ──▶ Exhausted
///                     Skip: nothing called
/// ```
pub struct RoutineHandle {
    id: HandleId,
    producer: Option<Producer>,
    current: Option<Box<dyn Routine>>,
    started: bool,
    executed: u64,
}

impl RoutineHandle {
    /// Wraps a producer. Nothing is pulled until [`start`](Self::start) or the first tick.
    pub fn new(id: HandleId, producer: Producer) -> Self {
        Self {
            id,
            producer: Some(producer),
            current: None,
            started: false,
            executed: 0,
        }
    }

    /// Performs the first step: pulls the first item and executes it.
    ///
    /// Does nothing if the handle already stepped.
    pub fn start(&mut self) -> Result<(), RoutineFault> {
        if self.started {
            return Ok(());
        }
        self.step()
    }

    /// Advances the coroutine by one frame.
    ///
    /// Forwards the tick to the current unit while it runs; otherwise pulls
    /// the next item. A unit reached this way is executed but not ticked until
    /// the next frame. Any error aborts the handle and is returned as a fault.
    pub fn tick(&mut self, time: &FrameTime) -> Result<(), RoutineFault> {
        if self.producer.is_none() {
            return Ok(());
        }

        if let Some(unit) = self.current.as_mut().filter(|unit| !unit.is_done()) {
            if let Err(error) = unit.tick(time) {
                return Err(self.abort(FaultOrigin::Tick, error));
            }
            return Ok(());
        }

        self.step()
    }

    fn step(&mut self) -> Result<(), RoutineFault> {
        self.started = true;
        self.current = None;

        let Some(producer) = self.producer.as_mut() else {
            return Ok(());
        };

        match producer.next() {
            Some(Ok(Yield::Routine(mut unit))) => {
                log::trace!("Coroutine {}: executing '{}'.", self.id, unit.name());
                if let Err(error) = unit.execute() {
                    self.current = Some(unit);
                    return Err(self.abort(FaultOrigin::Execute, error));
                }
                self.executed += 1;
                self.current = Some(unit);
                Ok(())
            }
            Some(Ok(Yield::Skip)) => {
                log::trace!("Coroutine {}: skipped one tick.", self.id);
                Ok(())
            }
            Some(Err(error)) => Err(self.abort(FaultOrigin::Producer, error)),
            None => {
                self.producer = None;
                log::debug!(
                    "Coroutine {} exhausted after {} unit(s).",
                    self.id,
                    self.executed
                );
                Ok(())
            }
        }
    }

    fn abort(&mut self, origin: FaultOrigin, error: RoutineError) -> RoutineFault {
        let unit = match origin {
            FaultOrigin::Producer => None,
            FaultOrigin::Execute | FaultOrigin::Tick => {
                self.current.as_ref().map(|unit| unit.name().to_owned())
            }
        };
        self.producer = None;
        self.current = None;

        let fault = RoutineFault {
            handle: self.id,
            origin,
            unit,
            message: error.to_string(),
        };
        log::warn!("{fault}");
        fault
    }

    /// Drops the producer and the current unit without calling them again.
    ///
    /// Returns `false` if the handle was already exhausted.
    pub fn stop(&mut self) -> bool {
        if self.producer.is_none() {
            return false;
        }
        self.producer = None;
        self.current = None;
        log::debug!("Coroutine {} stopped.", self.id);
        true
    }

    /// The handle's id.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The handle's state.
    pub fn state(&self) -> HandleState {
        if self.producer.is_some() {
            HandleState::Active
        } else {
            HandleState::Exhausted
        }
    }

    /// Whether the producer may still yield items.
    pub fn is_active(&self) -> bool {
        self.producer.is_some()
    }

    /// Whether the handle is finished for good.
    pub fn is_exhausted(&self) -> bool {
        self.producer.is_none()
    }

    /// Number of units executed so far.
    pub fn executed_count(&self) -> u64 {
        self.executed
    }

    /// Name of the current unit, if any.
    pub fn current_unit(&self) -> Option<&str> {
        self.current.as_deref().map(|unit| unit.name())
    }
}

impl fmt::Debug for RoutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("current", &self.current_unit())
            .field("executed", &self.executed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{Call, Wait};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Journal = Rc<RefCell<Vec<String>>>;

    /// A unit that records its calls and finishes after `ticks` ticks.
    struct Probe {
        label: &'static str,
        ticks: u32,
        seen: u32,
        journal: Journal,
    }

    impl Probe {
        fn boxed(label: &'static str, ticks: u32, journal: &Journal) -> Yield {
            Yield::routine(Probe {
                label,
                ticks,
                seen: 0,
                journal: Rc::clone(journal),
            })
        }
    }

    impl Routine for Probe {
        fn execute(&mut self) -> Result<(), RoutineError> {
            self.journal.borrow_mut().push(format!("{}:execute", self.label));
            Ok(())
        }

        fn tick(&mut self, _time: &FrameTime) -> Result<(), RoutineError> {
            self.seen += 1;
            self.journal.borrow_mut().push(format!("{}:tick", self.label));
            Ok(())
        }

        fn is_done(&self) -> bool {
            self.seen >= self.ticks
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct Broken;

    impl Routine for Broken {
        fn execute(&mut self) -> Result<(), RoutineError> {
            Ok(())
        }

        fn tick(&mut self, _time: &FrameTime) -> Result<(), RoutineError> {
            Err(RoutineError::failed("sensor offline"))
        }

        fn is_done(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn frame(millis: u64) -> FrameTime {
        FrameTime::from_delta(Duration::from_millis(millis))
    }

    fn started(id: u64, items: Vec<Yield>) -> RoutineHandle {
        let mut handle = RoutineHandle::new(HandleId(id), producer(items));
        handle.start().unwrap();
        handle
    }

    #[test]
    fn start_executes_first_unit() {
        let journal = Journal::default();
        let handle = started(0, vec![Probe::boxed("a", 1, &journal)]);

        assert_eq!(*journal.borrow(), vec!["a:execute"]);
        assert_eq!(handle.state(), HandleState::Active);
        assert_eq!(handle.current_unit(), Some("a"));
    }

    #[test]
    fn start_is_performed_once() {
        let journal = Journal::default();
        let mut handle = started(
            0,
            vec![Probe::boxed("a", 1, &journal), Probe::boxed("b", 1, &journal)],
        );
        handle.start().unwrap();
        assert_eq!(*journal.borrow(), vec!["a:execute"]);
    }

    #[test]
    fn empty_producer_is_exhausted_immediately() {
        let mut handle = started(0, Vec::new());
        assert_eq!(handle.state(), HandleState::Exhausted);

        for _ in 0..5 {
            handle.tick(&frame(16)).unwrap();
        }
        assert!(handle.is_exhausted());
        assert_eq!(handle.executed_count(), 0);
    }

    #[test]
    fn units_run_sequentially_without_overlap() {
        let journal = Journal::default();
        let mut handle = started(
            0,
            vec![
                Probe::boxed("a", 2, &journal),
                Probe::boxed("b", 1, &journal),
                Probe::boxed("c", 1, &journal),
            ],
        );

        for _ in 0..10 {
            handle.tick(&frame(16)).unwrap();
        }

        assert_eq!(
            *journal.borrow(),
            vec![
                "a:execute", "a:tick", "a:tick", // a done
                "b:execute", "b:tick", // b done
                "c:execute", "c:tick", // c done
            ]
        );
        assert_eq!(handle.executed_count(), 3);
        assert!(handle.is_exhausted());
    }

    #[test]
    fn unit_done_on_execute_is_stepped_past_on_next_tick() {
        let journal = Journal::default();
        let log = Rc::clone(&journal);
        let mut handle = started(
            0,
            vec![
                Call::action(move || log.borrow_mut().push("call".into())).into(),
                Probe::boxed("after", 1, &journal),
            ],
        );
        assert_eq!(*journal.borrow(), vec!["call"]);

        // One tick per advance: the probe is executed, not ticked.
        handle.tick(&frame(16)).unwrap();
        assert_eq!(*journal.borrow(), vec!["call", "after:execute"]);
    }

    #[test]
    fn skip_consumes_one_tick() {
        let journal = Journal::default();
        let mut handle = started(0, vec![Yield::Skip, Probe::boxed("a", 1, &journal)]);
        assert!(journal.borrow().is_empty());
        assert_eq!(handle.current_unit(), None);

        handle.tick(&frame(16)).unwrap();
        assert_eq!(*journal.borrow(), vec!["a:execute"]);
    }

    #[test]
    fn two_waits_end_to_end() {
        let mut handle = started(
            0,
            vec![
                Wait::seconds(1.0).unwrap().into(),
                Wait::seconds(2.0).unwrap().into(),
            ],
        );

        handle.tick(&frame(500)).unwrap();
        handle.tick(&frame(500)).unwrap(); // first wait done (1.0s)
        assert_eq!(handle.executed_count(), 1);

        handle.tick(&frame(1000)).unwrap(); // steps to and executes the second wait
        assert_eq!(handle.executed_count(), 2);

        handle.tick(&frame(1000)).unwrap();
        handle.tick(&frame(1000)).unwrap(); // second wait done (2.0s)
        assert!(handle.is_active());

        handle.tick(&frame(1000)).unwrap();
        assert!(handle.is_exhausted());
    }

    #[test]
    fn tick_fault_aborts_handle() {
        let journal = Journal::default();
        let mut handle = started(
            3,
            vec![Yield::routine(Broken), Probe::boxed("never", 1, &journal)],
        );

        let fault = handle.tick(&frame(16)).unwrap_err();
        assert_eq!(fault.handle, HandleId(3));
        assert_eq!(fault.origin, FaultOrigin::Tick);
        assert_eq!(fault.unit.as_deref(), Some("broken"));
        assert_eq!(fault.message, "routine failed: sensor offline");
        assert!(handle.is_exhausted());

        handle.tick(&frame(16)).unwrap();
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn execute_fault_is_reported_by_start() {
        let mut handle = RoutineHandle::new(
            HandleId(1),
            producer(vec![Call::new(|| Err(RoutineError::failed("boom"))).into()]),
        );
        let fault = handle.start().unwrap_err();
        assert_eq!(fault.origin, FaultOrigin::Execute);
        assert_eq!(fault.unit.as_deref(), Some("Call"));
        assert!(handle.is_exhausted());
    }

    #[test]
    fn producer_fault_aborts_handle() {
        let items: Vec<Result<Yield, RoutineError>> = vec![
            Ok(Yield::Skip),
            Err(RoutineError::failed("script error")),
            Ok(Yield::Skip),
        ];
        let mut handle = RoutineHandle::new(HandleId(2), fallible_producer(items));
        handle.start().unwrap();

        let fault = handle.tick(&frame(16)).unwrap_err();
        assert_eq!(fault.origin, FaultOrigin::Producer);
        assert_eq!(fault.unit, None);
        assert_eq!(
            fault.to_string(),
            "coroutine #2 aborted by its producer: routine failed: script error"
        );
        assert!(handle.is_exhausted());
    }

    #[test]
    fn stop_drops_the_current_unit() {
        let journal = Journal::default();
        let mut handle = started(0, vec![Probe::boxed("a", 10, &journal)]);

        assert!(handle.stop());
        assert!(!handle.stop());
        handle.tick(&frame(16)).unwrap();
        assert_eq!(*journal.borrow(), vec!["a:execute"]);
        assert_eq!(handle.current_unit(), None);
    }

    #[test]
    fn infinite_producer_keeps_running() {
        let mut handle = RoutineHandle::new(
            HandleId(1),
            producer(std::iter::repeat_with(|| Yield::from(Wait::next_tick()))),
        );
        handle.start().unwrap();
        for _ in 0..1000 {
            handle.tick(&frame(16)).unwrap();
        }
        assert!(handle.is_active());
        // Each wait takes one tick to finish and one to be stepped past.
        assert_eq!(handle.executed_count(), 501);
    }
}
