//! Engine constants shared by the logic and core crates.
//!
//! Values are plain `f64`/`u32` constants grouped by concern. The core
//! crate copies the tunable ones into its `EngineConfig` defaults.

pub mod time {
    /// Millisols in one sol.
    pub const MILLISOLS_PER_SOL: f64 = 1000.0;
}

pub mod accident {
    /// Base accident chance per millisol before skill scaling.
    pub const BASE_CHANCE: f64 = 0.001;
    /// Stress added to a person involved in an accident.
    pub const ACCIDENT_STRESS: f64 = 10.0;
}

pub mod eva {
    /// Suit oxygen/water below this fraction of capacity ends an EVA.
    pub const MIN_RESOURCE_FRACTION: f64 = 0.15;
    /// Performance below this ends an EVA.
    pub const MIN_PERFORMANCE: f64 = 0.5;
    /// Performance needed to start an egress at all.
    pub const MIN_EXIT_PERFORMANCE: f64 = 0.05;
    /// Suit capacities in kg.
    pub const SUIT_OXYGEN_CAPACITY: f64 = 1.0;
    pub const SUIT_WATER_CAPACITY: f64 = 4.0;
    /// kg drawn from a worn suit per millisol outside.
    pub const OXYGEN_USE_RATE: f64 = 0.0009;
    pub const WATER_USE_RATE: f64 = 0.0025;
}

pub mod airlock {
    /// Time for a full pressurize or depressurize cycle (millisols).
    pub const CYCLE_TIME: f64 = 10.0;
    /// Maximum reservations held at once.
    pub const MAX_RESERVED: usize = 4;
    /// Waiting beyond this aborts an airlock transit (millisols).
    pub const WAIT_LIMIT: f64 = 100.0;
    pub const PREBREATHE_TIME: f64 = 40.0;
    pub const DON_SUIT_TIME: f64 = 15.0;
    pub const DOFF_SUIT_TIME: f64 = 10.0;
    pub const CLEAN_UP_TIME: f64 = 15.0;
    pub const WALK_TIME: f64 = 2.0;
}

pub mod tasks {
    /// Upper bound on any single task weight.
    pub const MAX_TASK_PROBABILITY: f64 = 20_000.0;
    /// Floor applied to efficiency for effort-driven tasks.
    pub const MIN_EFFICIENCY: f64 = 0.1;
    /// Fraction of a positive stress modifier removed per effective skill level.
    pub const SKILL_STRESS_MODIFIER: f64 = 0.1;
}

pub mod condition {
    pub const FATIGUE_THRESHOLD: f64 = 500.0;
    pub const HUNGER_THRESHOLD: f64 = 250.0;
    pub const MAX_STRESS: f64 = 100.0;
    pub const FATIGUE_PERFORMANCE_MODIFIER: f64 = 0.0005;
    pub const HUNGER_PERFORMANCE_MODIFIER: f64 = 0.0001;
    pub const STRESS_PERFORMANCE_MODIFIER: f64 = 0.005;
}

pub mod malfunction {
    /// Wear condition of a new or freshly maintained entity.
    pub const FULL_WEAR_CONDITION: f64 = 100.0;
    /// Effective time since maintenance above which maintenance is due.
    pub const MAINTENANCE_DUE: f64 = 1000.0;
}
