//! Mars clock in millisols.

use serde::{Deserialize, Serialize};

use marsbase_logic::constants::time::MILLISOLS_PER_SOL;

/// Elapsed simulation time since landing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarsClock {
    total_millisols: f64,
}

impl MarsClock {
    pub fn new(total_millisols: f64) -> Self {
        Self {
            total_millisols: total_millisols.max(0.0),
        }
    }

    pub fn advance(&mut self, time: f64) {
        if time > 0.0 {
            self.total_millisols += time;
        }
    }

    pub fn total_millisols(&self) -> f64 {
        self.total_millisols
    }

    /// Sols completed, starting from 1 on landing day.
    pub fn sol(&self) -> u32 {
        (self.total_millisols / MILLISOLS_PER_SOL) as u32 + 1
    }

    /// Time of day in `[0, 1000)`.
    pub fn millisol_of_sol(&self) -> f64 {
        self.total_millisols % MILLISOLS_PER_SOL
    }

    /// Whole-millisol stamp, used to key per-millisol caches.
    pub fn stamp(&self) -> u64 {
        self.total_millisols as u64
    }
}

impl std::fmt::Display for MarsClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sol {} {:06.2}", self.sol(), self.millisol_of_sol())
    }
}
