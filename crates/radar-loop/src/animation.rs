// Copyright 2025 Chris Custine
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

//! Animation loop and the long-interval refresh timer.
//!
//! Both are explicit `Stopped -> Running -> Stopped` state machines whose
//! `tick()` futures are meant to sit in a `tokio::select!` next to other event
//! sources. A stopped timer's `tick()` never resolves.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug)]
enum TimerState {
    Stopped,
    Running(Interval),
}

/// Fixed-period timer that can be started and stopped any number of times.
#[derive(Debug)]
pub struct PeriodicTimer {
    period: Duration,
    state: TimerState,
}

impl PeriodicTimer {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { period, state: TimerState::Stopped }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running(_))
    }

    /// Start ticking one period from now. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.state = TimerState::Running(interval);
        true
    }

    /// Stop ticking. Returns `true` if the timer was running. Idempotent.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.state = TimerState::Stopped;
        was_running
    }

    /// Change the period, restarting the timer if it was running.
    pub fn set_period(&mut self, period: Duration) {
        if period == self.period {
            return;
        }
        self.period = period;
        if self.stop() {
            self.start();
        }
    }

    /// Wait for the next tick. Pends forever while stopped.
    pub async fn tick(&mut self) {
        match &mut self.state {
            TimerState::Running(interval) => {
                interval.tick().await;
            }
            TimerState::Stopped => std::future::pending::<()>().await,
        }
    }
}

/// Drives frame advancement at a fixed interval while the widget is visible.
#[derive(Debug)]
pub struct AnimationLoop {
    timer: PeriodicTimer,
}

impl AnimationLoop {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { timer: PeriodicTimer::new(interval) }
    }

    /// Begin animating. No-op if already running or not visible.
    pub fn start(&mut self, visible: bool) -> bool {
        if !visible {
            return false;
        }
        self.timer.start()
    }

    pub fn stop(&mut self) -> bool {
        self.timer.stop()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.timer.period()
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.timer.set_period(interval);
    }

    pub async fn tick(&mut self) {
        self.timer.tick().await;
    }
}
