//! Cooperative tick-driven scheduler (spec §4.6).
//!
//! Grounded in `original_source/src/main.cpp`'s `EventLoop::run(log, clock,
//! ..., tasks_array, task_count, ...)` over a fixed `Runnable2*[]` array, and
//! in the teacher's `cadence.rs` metronome-tick pattern (fixed-cadence work
//! driven by an explicit clock rather than ad-hoc sleeps).

use crate::clock::Clock;

/// A component driven by the EventLoop. `poll` is called every iteration and
/// MUST return promptly; `tick` is called once per 20 ms audio tick.
pub trait Runnable {
    fn poll(&mut self, now_ms: u32);
    fn tick(&mut self, now_ms: u32);
}

/// Single-threaded cooperative scheduler over a fixed set of [`Runnable`]s.
///
/// Never allocates in steady state: the Runnable list is fixed at
/// construction and `run`'s inner loop only reads the clock and calls
/// through the stored trait objects.
pub struct EventLoop<'a> {
    runnables: Vec<&'a mut dyn Runnable>,
    tick_ms: u32,
    next_tick_ms: u32,
}

impl<'a> EventLoop<'a> {
    #[must_use]
    pub fn new(tick_ms: u32) -> Self {
        Self {
            runnables: Vec::new(),
            tick_ms,
            next_tick_ms: 0,
        }
    }

    pub fn register(&mut self, runnable: &'a mut dyn Runnable) {
        self.runnables.push(runnable);
    }

    /// Polls every Runnable once, and ticks all of them if the configured
    /// tick period has elapsed. Returns `true` if a tick fired.
    pub fn step(&mut self, clock: &dyn Clock) -> bool {
        let now = clock.now_ms();
        for runnable in self.runnables.iter_mut() {
            runnable.poll(now);
        }

        if now >= self.next_tick_ms {
            for runnable in self.runnables.iter_mut() {
                runnable.tick(now);
            }
            self.next_tick_ms = now + self.tick_ms;
            true
        } else {
            false
        }
    }

    /// Runs `step` in a loop until `should_stop` returns true, polling as
    /// fast as the OS scheduler allows between ticks. The primary thread's
    /// `main` calls this; tests instead call `step` directly against a
    /// [`crate::clock::ManualClock`].
    pub fn run(&mut self, clock: &dyn Clock, mut should_stop: impl FnMut() -> bool) {
        while !should_stop() {
            self.step(clock);
            std::thread::yield_now();
        }
    }
}
