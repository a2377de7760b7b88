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

//! The launch script the runtime plays out.
//!
//! A countdown, a tracker that reacts to the launch and spawns a follow-up
//! sequence, and a telemetry probe that fails halfway to show that a broken
//! coroutine does not take the others down.

use cadence_core::{
    Call, CoroutineScheduler, Coroutines, HandleId, RoutineError, Spawner, Wait, WaitFrames,
    WaitUntil, Yield,
};
use log::info;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Ids of the coroutines submitted by [`install`].
#[derive(Debug, Clone, Copy)]
pub struct LaunchScript {
    pub countdown: HandleId,
    pub tracker: HandleId,
    pub telemetry: HandleId,
}

/// Submits the launch script to `scheduler`.
pub fn install(scheduler: &mut CoroutineScheduler, countdown_from: u32) -> LaunchScript {
    let launched = Rc::new(Cell::new(false));
    let spawner = scheduler.spawner();

    LaunchScript {
        countdown: countdown(scheduler, countdown_from, Rc::clone(&launched)),
        tracker: tracker(scheduler, launched, spawner),
        telemetry: telemetry(scheduler),
    }
}

fn countdown<C: Coroutines>(runner: &mut C, from: u32, launched: Rc<Cell<bool>>) -> HandleId {
    let steps = (1..=from).rev().flat_map(|n| {
        [
            Yield::from(Call::action(move || info!("T-minus {n}"))),
            Yield::from(Wait::new(Duration::from_secs(1))),
        ]
    });
    let liftoff = Call::action(move || {
        launched.set(true);
        info!("Liftoff!");
    });
    runner.run(steps.chain(std::iter::once(Yield::from(liftoff))))
}

fn tracker<C: Coroutines>(runner: &mut C, launched: Rc<Cell<bool>>, spawner: Spawner) -> HandleId {
    let separation = Call::action(move || {
        info!("Tracking vehicle.");
        spawner.submit([
            Yield::from(WaitFrames::new(30)),
            Yield::from(Call::action(|| info!("Booster separation confirmed."))),
        ]);
    });
    runner.run([
        Yield::from(WaitUntil::new(move |_| launched.get())),
        Yield::from(separation),
    ])
}

fn telemetry<C: Coroutines>(runner: &mut C) -> HandleId {
    runner.run_fallible([
        Ok(Yield::from(Call::action(|| info!("Telemetry link up.")))),
        Ok(Yield::from(Wait::millis(1500))),
        Err(RoutineError::failed("telemetry link lost")),
    ])
}
