// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Submission,
    Analysis,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The two fixed durations of a round, in seconds. `window < cycle` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleTiming {
    window: u64,
    cycle: u64,
}

impl CycleTiming {
    pub fn new(window: u64, cycle: u64) -> anyhow::Result<Self> {
        if window == 0 || window >= cycle {
            anyhow::bail!(
                "submission window ({}) must be non zero and shorter than the cycle ({})",
                window,
                cycle
            );
        }
        Ok(Self { window, cycle })
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Phase of a round started at `start`, observed at `now`.
    pub fn phase(&self, now: u64, start: u64, closed: bool) -> Phase {
        if closed {
            return Phase::Completed;
        }
        let elapsed = now.saturating_sub(start);
        if elapsed < self.window {
            Phase::Submission
        } else if elapsed < self.cycle {
            Phase::Analysis
        } else {
            Phase::Completed
        }
    }

    /// Earliest time at which a round started at `start` may be superseded.
    pub fn cycle_end(&self, start: u64) -> u64 {
        start.saturating_add(self.cycle)
    }
}
