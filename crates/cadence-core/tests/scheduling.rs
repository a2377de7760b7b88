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

//! End-to-end scheduling scenarios driven through the public API.

use cadence_core::{
    Call, CompactionPolicy, CoroutineScheduler, FaultOrigin, FrameClock, FrameSystem, FrameTime,
    HandleState, Routine, RoutineError, SchedulerConfig, SchedulerEvent, Wait, WaitUntil, Yield,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Execute(usize),
    Tick(usize),
}

type Calls = Rc<RefCell<Vec<Seen>>>;

/// Finishes after a fixed number of ticks and records every call it receives.
struct Counted {
    index: usize,
    remaining: u32,
    calls: Calls,
}

impl Routine for Counted {
    fn execute(&mut self) -> Result<(), RoutineError> {
        self.calls.borrow_mut().push(Seen::Execute(self.index));
        Ok(())
    }

    fn tick(&mut self, _time: &FrameTime) -> Result<(), RoutineError> {
        assert!(self.remaining > 0, "ticked after completion");
        self.remaining -= 1;
        self.calls.borrow_mut().push(Seen::Tick(self.index));
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.remaining == 0
    }
}

fn delta(seconds: f64) -> FrameTime {
    FrameTime::from_secs(seconds)
}

#[test]
fn every_unit_is_executed_exactly_once_after_its_predecessor_finished() {
    const UNITS: usize = 6;
    let calls = Calls::default();
    let mut scheduler = CoroutineScheduler::new();

    let producer_calls = Rc::clone(&calls);
    let id = scheduler.submit((0..UNITS).map(move |index| {
        Yield::routine(Counted {
            index,
            remaining: (index % 3) as u32,
            calls: Rc::clone(&producer_calls),
        })
    }));

    let mut frames = 0;
    while scheduler.state(id) == Some(HandleState::Active) {
        scheduler.tick(&delta(0.016));
        frames += 1;
        assert!(frames < 100, "coroutine never finished");
    }

    let calls = calls.borrow();
    let executes: Vec<usize> = calls
        .iter()
        .filter_map(|call| match call {
            Seen::Execute(index) => Some(*index),
            Seen::Tick(_) => None,
        })
        .collect();
    assert_eq!(executes, (0..UNITS).collect::<Vec<_>>());

    // Between two executes, the previous unit received exactly the ticks it needed.
    for index in 0..UNITS {
        let ticks = calls.iter().filter(|call| **call == Seen::Tick(index)).count();
        assert_eq!(ticks, index % 3, "unit {index}");
    }
    let mut last_execute = None;
    for call in calls.iter() {
        match call {
            Seen::Execute(index) => last_execute = Some(*index),
            Seen::Tick(index) => assert_eq!(Some(*index), last_execute),
        }
    }
}

#[test]
fn two_waits_complete_on_their_own_clocks() {
    let mut scheduler = CoroutineScheduler::new();
    let id = scheduler.submit([
        Yield::from(Wait::seconds(1.0).unwrap()),
        Yield::from(Wait::seconds(2.0).unwrap()),
    ]);
    let handle = |scheduler: &CoroutineScheduler| {
        let handle = scheduler.handle(id).expect("handle is retained");
        (handle.executed_count(), handle.state())
    };

    scheduler.tick(&delta(0.5));
    scheduler.tick(&delta(0.5));
    assert_eq!(handle(&scheduler), (1, HandleState::Active));

    // Stepping to the second wait executes it; this frame's delta is not counted.
    scheduler.tick(&delta(1.0));
    assert_eq!(handle(&scheduler), (2, HandleState::Active));

    scheduler.tick(&delta(1.0));
    scheduler.tick(&delta(1.0));
    assert_eq!(handle(&scheduler), (2, HandleState::Active));

    let report = scheduler.tick(&delta(1.0));
    assert_eq!(report.exhausted, vec![id]);
    assert_eq!(handle(&scheduler), (2, HandleState::Exhausted));
}

#[test]
fn empty_sequence_is_inert() {
    let mut scheduler = CoroutineScheduler::with_config(SchedulerConfig {
        compaction: CompactionPolicy::Never,
        ..SchedulerConfig::default()
    })
    .unwrap();
    let id = scheduler.submit(std::iter::empty());
    assert_eq!(scheduler.state(id), Some(HandleState::Exhausted));

    for _ in 0..10 {
        let report = scheduler.tick(&delta(0.0));
        assert!(report.is_clean());
        assert!(report.exhausted.is_empty());
    }
    assert_eq!(scheduler.handle(id).map(|h| h.executed_count()), Some(0));
}

#[test]
fn failing_coroutine_does_not_stop_the_others() {
    let mut scheduler = CoroutineScheduler::new();
    let progress = Rc::new(Cell::new(0u32));

    let counter = Rc::clone(&progress);
    let steady = scheduler.submit(std::iter::repeat_with(move || {
        let counter = Rc::clone(&counter);
        Yield::from(Call::action(move || counter.set(counter.get() + 1)))
    }));
    let failing = scheduler.submit_fallible([
        Ok(Yield::from(Wait::next_tick())),
        Err(RoutineError::failed("corrupt save")),
    ]);

    let mut faults = Vec::new();
    for _ in 0..6 {
        faults.extend(scheduler.tick(&delta(0.016)).faults);
    }

    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].handle, failing);
    assert_eq!(faults[0].origin, FaultOrigin::Producer);
    assert_eq!(scheduler.state(steady), Some(HandleState::Active));
    // One action at submit, then one per tick.
    assert_eq!(progress.get(), 7);

    let faulted = scheduler
        .events()
        .try_iter()
        .filter(|event| matches!(event, SchedulerEvent::Faulted(_)))
        .count();
    assert_eq!(faulted, 1);
}

#[test]
fn host_loop_drives_scheduler_as_frame_system() {
    let mut scheduler = CoroutineScheduler::new();
    let door_open = Rc::new(Cell::new(false));
    let log = Rc::new(RefCell::new(Vec::new()));

    let opener = Rc::clone(&door_open);
    let opener_log = Rc::clone(&log);
    scheduler.submit([
        Yield::from(Wait::millis(100)),
        Yield::from(Call::action(move || {
            opener.set(true);
            opener_log.borrow_mut().push("door opened");
        })),
    ]);

    let watcher = Rc::clone(&door_open);
    let watcher_log = Rc::clone(&log);
    let spawner = scheduler.spawner();
    scheduler.submit([
        Yield::from(WaitUntil::new(move |_| watcher.get())),
        Yield::from(Call::action(move || {
            watcher_log.borrow_mut().push("guard alerted");
            let reinforcement_log = Rc::clone(&watcher_log);
            spawner.submit([Yield::from(Call::action(move || {
                reinforcement_log.borrow_mut().push("reinforcements arrive");
            }))]);
        })),
    ]);

    let mut clock = FrameClock::with_target_rate(60);
    let mut systems: Vec<&mut dyn FrameSystem> = vec![&mut scheduler];
    for _ in 0..20 {
        let time = clock.advance(Duration::from_millis(25));
        for system in systems.iter_mut() {
            system.update(&time);
        }
    }

    assert_eq!(
        *log.borrow(),
        vec!["door opened", "guard alerted", "reinforcements arrive"]
    );
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.frame_count(), 20);
}

#[test]
fn configuration_loaded_from_json_applies() {
    let config = SchedulerConfig::from_json_str(r#"{ "compaction": { "every_ticks": 1 } }"#).unwrap();
    let mut scheduler = CoroutineScheduler::with_config(config).unwrap();
    let id = scheduler.submit([Yield::Skip]);

    let report = scheduler.tick(&delta(0.016));
    assert_eq!(report.exhausted, vec![id]);
    assert_eq!(report.compacted, 1);
    assert!(scheduler.is_empty());
    assert_eq!(scheduler.state(id), Some(HandleState::Exhausted));
}
