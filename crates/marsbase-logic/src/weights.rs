//! Per-task probability heuristics.
//!
//! Each function turns a handful of plain inputs gathered from the world
//! into a non-negative selection weight. A weight of 0 means the task is
//! currently infeasible for the person. The core crate gathers the inputs
//! and applies the global cap; these functions only encode the shape of
//! each heuristic.

use serde::{Deserialize, Serialize};

use crate::constants::condition::{FATIGUE_THRESHOLD, HUNGER_THRESHOLD};
use crate::constants::malfunction::MAINTENANCE_DUE;

/// Sleep: only once fatigue passes the threshold, doubled in darkness.
pub fn sleep(fatigue: f64, dark: bool, outside: bool) -> f64 {
    if outside || fatigue <= FATIGUE_THRESHOLD {
        return 0.0;
    }
    let mut result = (fatigue - FATIGUE_THRESHOLD) / 4.0;
    if dark {
        result *= 2.0;
    }
    result
}

/// EatMeal: proportional to hunger once past the threshold, needs food at hand.
pub fn eat_meal(hunger: f64, food_available: bool, outside: bool) -> f64 {
    if outside || !food_available || hunger <= HUNGER_THRESHOLD {
        return 0.0;
    }
    hunger / 10.0
}

/// Relax: a small baseline that grows with stress.
pub fn relax(stress: f64, outside: bool) -> f64 {
    if outside {
        return 0.0;
    }
    10.0 + stress.max(0.0) / 5.0
}

/// Workout: stress relief, discouraged by fatigue.
pub fn workout(stress: f64, fatigue: f64, gym_available: bool) -> f64 {
    if !gym_available || fatigue > 700.0 {
        return 0.0;
    }
    (3.0 + stress * 0.5 - fatigue / 100.0).max(0.0)
}

/// RepairMalfunction: per malfunctioning entity in reach.
pub fn repair_malfunction(malfunctioning: usize, performance: f64) -> f64 {
    50.0 * malfunctioning as f64 * performance
}

/// MaintainGroundVehicleGarage: one contribution per overdue vehicle.
pub fn maintain_vehicle(effective_times_since_maintenance: &[f64]) -> f64 {
    effective_times_since_maintenance
        .iter()
        .filter(|&&t| t > MAINTENANCE_DUE)
        .map(|t| (t / 50.0).min(100.0))
        .sum()
}

/// TendGreenhouse: outstanding crop work, capped.
pub fn tend_greenhouse(outstanding_work: f64, performance: f64) -> f64 {
    if outstanding_work <= 0.0 {
        return 0.0;
    }
    (5.0 + outstanding_work / 10.0).min(100.0) * performance
}

/// ManufactureGood: best startable process value plus pending work.
pub fn manufacture(best_process_value: f64, work_waiting: bool, performance: f64) -> f64 {
    let mut result = best_process_value.max(0.0) * 10.0;
    if best_process_value > 0.0 {
        result += 25.0;
    }
    if work_waiting {
        result += 10.0;
    }
    result * performance
}

/// ResearchScience: skill in the best science a free lab supports.
pub fn research(best_science_skill: Option<u32>, performance: f64) -> f64 {
    match best_science_skill {
        Some(skill) => (5.0 + 5.0 * skill as f64) * performance,
        None => 0.0,
    }
}

/// MedicalAssistance: patients waiting for care at a working infirmary.
pub fn medical_assistance(patients_waiting: usize, infirmary: bool, performance: f64) -> f64 {
    if !infirmary {
        return 0.0;
    }
    (100.0 * patients_waiting as f64).min(300.0) * performance
}

/// Teach: students doing teachable work with nobody teaching them.
pub fn teach(candidate_students: usize) -> f64 {
    (20.0 * candidate_students as f64).min(60.0)
}

/// Inputs for the ToggleResourceProcess heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToggleInputs {
    /// Value gained by flipping the best process (goods-value units).
    pub value_diff: f64,
    /// Building has no life support, so the toggle needs an EVA.
    pub needs_eva: bool,
    pub sunlight: bool,
    pub dark_polar_region: bool,
    pub overcrowded: bool,
    pub performance: f64,
}

/// ToggleResourceProcess: value of toggling, gated by EVA daylight.
pub fn toggle_resource_process(inputs: &ToggleInputs) -> f64 {
    if inputs.value_diff <= 0.0 {
        return 0.0;
    }
    if inputs.needs_eva && !inputs.sunlight && !inputs.dark_polar_region {
        return 0.0;
    }
    let mut result = (inputs.value_diff * 10_000.0).min(100.0);
    if inputs.overcrowded {
        result *= 2.0;
    }
    result * inputs.performance
}

/// CollectIce / CollectRegolith: settlement shortfall of the resource.
pub fn collect_resource(stock: f64, capacity: f64, can_collect: bool) -> f64 {
    if !can_collect || capacity <= 0.0 {
        return 0.0;
    }
    let shortfall = (1.0 - stock / capacity).clamp(0.0, 1.0);
    50.0 * shortfall
}

/// LoadVehicleGarage: flat weight while a loadable manifest is pending.
pub fn load_vehicle(loadable_mass: f64) -> f64 {
    if loadable_mass > 0.0 {
        50.0
    } else {
        0.0
    }
}
