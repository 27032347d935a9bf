// src/exam/timer.rs

use serde::{Deserialize, Serialize};

/// Default exam length: 3 hours.
pub const DEFAULT_DURATION_SECS: u32 = 10_800;

/// Longest paper the admin tools accept: one day.
pub const MAX_DURATION_SECS: u32 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Running,
    /// Reached zero on its own.
    Expired,
    /// Halted by a user-initiated submit.
    Stopped,
}

/// Result of a single one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still running with this many seconds left.
    Running(u32),
    /// This tick took the countdown to zero.
    Expired,
    /// The countdown had already finished; nothing changed.
    Idle,
}

/// One-shot countdown. There is no way back to `Running`.
#[derive(Debug, Clone)]
pub struct Countdown {
    initial: u32,
    remaining: u32,
    state: TimerState,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            initial: duration_secs,
            remaining: duration_secs,
            state: if duration_secs == 0 {
                TimerState::Expired
            } else {
                TimerState::Running
            },
        }
    }

    pub fn tick(&mut self) -> Tick {
        if self.state != TimerState::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = TimerState::Expired;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    /// Halts a running countdown. Has no effect once expired.
    pub fn stop(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed(&self) -> u32 {
        self.initial - self.remaining
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_SECS)
    }
}
