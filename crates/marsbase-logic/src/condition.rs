//! Physical condition: fatigue, hunger, stress and the performance rating
//! derived from them.
//!
//! Fatigue and hunger grow with time (roughly one point per millisol) and
//! are relieved by sleeping and eating. Stress lives on a 0-100 scale.
//! Performance is 1.0 for a rested, fed, calm person and drops as any of
//! the three climbs past its comfort band.

use serde::{Deserialize, Serialize};

use crate::constants::condition::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalCondition {
    pub fatigue: f64,
    pub hunger: f64,
    pub stress: f64,
    performance: f64,
}

impl Default for PhysicalCondition {
    fn default() -> Self {
        Self {
            fatigue: 0.0,
            hunger: 0.0,
            stress: 0.0,
            performance: 1.0,
        }
    }
}

/// Per-millisol rates applied by [`PhysicalCondition::time_passing`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionRates {
    pub fatigue: f64,
    pub hunger: f64,
    pub stress_recovery: f64,
}

impl Default for ConditionRates {
    fn default() -> Self {
        Self {
            fatigue: 1.0,
            hunger: 1.0,
            stress_recovery: 0.01,
        }
    }
}

impl PhysicalCondition {
    pub fn new(fatigue: f64, hunger: f64, stress: f64) -> Self {
        let mut condition = Self {
            fatigue: fatigue.max(0.0),
            hunger: hunger.max(0.0),
            stress: stress.clamp(0.0, MAX_STRESS),
            performance: 1.0,
        };
        condition.recalculate_performance();
        condition
    }

    pub fn performance(&self) -> f64 {
        self.performance
    }

    /// Override the rating directly (injury, scripted scenarios).
    pub fn set_performance(&mut self, performance: f64) {
        self.performance = performance.clamp(0.0, 1.0);
    }

    pub fn time_passing(&mut self, time: f64, rates: &ConditionRates) {
        self.fatigue += time * rates.fatigue;
        self.hunger += time * rates.hunger;
        self.stress = (self.stress - time * rates.stress_recovery).max(0.0);
        self.recalculate_performance();
    }

    pub fn add_stress(&mut self, delta: f64) {
        if delta.is_finite() {
            self.stress = (self.stress + delta).clamp(0.0, MAX_STRESS);
        }
    }

    pub fn reduce_fatigue(&mut self, amount: f64) {
        self.fatigue = (self.fatigue - amount.max(0.0)).max(0.0);
    }

    pub fn add_fatigue(&mut self, amount: f64) {
        self.fatigue += amount.max(0.0);
    }

    pub fn reduce_hunger(&mut self, amount: f64) {
        self.hunger = (self.hunger - amount.max(0.0)).max(0.0);
    }

    pub fn is_tired(&self) -> bool {
        self.fatigue > FATIGUE_THRESHOLD
    }

    pub fn is_hungry(&self) -> bool {
        self.hunger > HUNGER_THRESHOLD
    }

    pub fn recalculate_performance(&mut self) {
        self.performance = performance_rating(self.fatigue, self.hunger, self.stress);
    }
}

/// Performance rating for the given condition, in `[0, 1]`.
pub fn performance_rating(fatigue: f64, hunger: f64, stress: f64) -> f64 {
    let mut p = 1.0;

    if hunger > 1600.0 {
        p -= (hunger - 1600.0) * HUNGER_PERFORMANCE_MODIFIER / 2.0;
    } else if hunger > 800.0 {
        p -= (hunger - 800.0) * HUNGER_PERFORMANCE_MODIFIER / 4.0;
    }

    if fatigue > 1500.0 {
        p -= (fatigue - 1500.0) * FATIGUE_PERFORMANCE_MODIFIER / 2.0;
    } else if fatigue > 700.0 {
        p -= (fatigue - 700.0) * FATIGUE_PERFORMANCE_MODIFIER / 4.0;
    }

    if stress > 90.0 {
        p -= (stress - 90.0) * STRESS_PERFORMANCE_MODIFIER / 2.0;
    } else if stress > 50.0 {
        p -= (stress - 50.0) * STRESS_PERFORMANCE_MODIFIER / 4.0;
    }

    p.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rested_person_full_performance() {
        assert_eq!(performance_rating(0.0, 0.0, 0.0), 1.0);
        assert_eq!(performance_rating(700.0, 800.0, 50.0), 1.0);
    }

    #[test]
    fn test_fatigue_degrades_performance() {
        let p = performance_rating(1100.0, 0.0, 0.0);
        assert!((p - 0.95).abs() < 1e-9, "got {}", p);
        assert!(performance_rating(6000.0, 0.0, 0.0) < 0.0 + 1e-9);
    }

    #[test]
    fn test_time_passing_accumulates() {
        let mut c = PhysicalCondition::new(0.0, 0.0, 20.0);
        c.time_passing(100.0, &ConditionRates::default());
        assert_eq!(c.fatigue, 100.0);
        assert_eq!(c.hunger, 100.0);
        assert!((c.stress - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_stress_clamped() {
        let mut c = PhysicalCondition::default();
        c.add_stress(250.0);
        assert_eq!(c.stress, MAX_STRESS);
        c.add_stress(-500.0);
        assert_eq!(c.stress, 0.0);
        c.add_stress(f64::NAN);
        assert_eq!(c.stress, 0.0);
    }

    #[test]
    fn test_relief_never_negative() {
        let mut c = PhysicalCondition::new(10.0, 10.0, 0.0);
        c.reduce_fatigue(50.0);
        c.reduce_hunger(50.0);
        assert_eq!(c.fatigue, 0.0);
        assert_eq!(c.hunger, 0.0);
    }
}
