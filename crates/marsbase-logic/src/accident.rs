//! Skill-scaled accident probability.
//!
//! Every hazard-exposed task rolls once per tick for an accident. The
//! chance starts at a base value and is scaled by the agent's relevant
//! skill: novices (skill 3 and under) multiply it by `4 - skill`, experts
//! divide it by `skill - 2`. The roll succeeds when a uniform draw in
//! `[0, 1)` falls below `chance * time`, so longer ticks are riskier.
//!
//! ```
//! use marsbase_logic::accident::{accident_chance, accident_triggered};
//!
//! let chance = accident_chance(0.001, 0);
//! assert!((chance - 0.004).abs() < 1e-12);
//! assert!(accident_triggered(chance, 10.0, 0.039));
//! assert!(!accident_triggered(chance, 10.0, 0.041));
//! ```

/// Skill multiplier applied to the base accident chance.
pub fn skill_modifier(skill: i32) -> f64 {
    if skill <= 3 {
        (4 - skill) as f64
    } else {
        1.0 / (skill - 2) as f64
    }
}

/// Effective per-millisol accident chance for a given skill level.
pub fn accident_chance(base_chance: f64, skill: i32) -> f64 {
    base_chance * skill_modifier(skill)
}

/// Accident multiplier for worn equipment; 1.0 when in perfect condition.
pub fn wear_modifier(wear_condition: f64) -> f64 {
    let wear = wear_condition.clamp(0.0, 100.0);
    1.0 + (100.0 - wear) / 100.0
}

/// Bernoulli trial for a tick of `time` millisols given a uniform `roll`.
pub fn accident_triggered(chance: f64, time: f64, roll: f64) -> bool {
    roll < chance * time
}
