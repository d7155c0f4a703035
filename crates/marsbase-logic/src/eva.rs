//! EVA safety interrupt.
//!
//! An EVA operation is checked every tick before any outdoor work is
//! done. The first failing condition, in the order of [`EvaAbortReason`],
//! ends the operation and sends the person back to the airlock.
//!
//! Resource limits sit exactly on the boundary: a suit holding 15% of
//! its oxygen capacity may stay out, anything below that ends the EVA.
//! See [`resource_depleted`].

use serde::{Deserialize, Serialize};

use crate::constants::eva::{MIN_PERFORMANCE, MIN_RESOURCE_FRACTION};

/// Snapshot of a worn suit's life-support state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuitReading {
    pub oxygen: f64,
    pub oxygen_capacity: f64,
    pub water: f64,
    pub water_capacity: f64,
    pub life_support_ok: bool,
    pub malfunction: bool,
}

/// Everything the safety interrupt looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaConditions {
    pub solar_irradiance: f64,
    pub in_dark_polar_region: bool,
    pub suit: Option<SuitReading>,
    pub performance: f64,
}

/// Thresholds, normally taken from the engine config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaLimits {
    pub min_resource_fraction: f64,
    pub min_performance: f64,
}

impl Default for EvaLimits {
    fn default() -> Self {
        Self {
            min_resource_fraction: MIN_RESOURCE_FRACTION,
            min_performance: MIN_PERFORMANCE,
        }
    }
}

/// Reason an EVA has to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaAbortReason {
    Darkness,
    NoSuit,
    LowOxygen,
    LowWater,
    LifeSupportFailure,
    SuitMalfunction,
    LowPerformance,
}

impl EvaAbortReason {
    pub fn describe(self) -> &'static str {
        match self {
            EvaAbortReason::Darkness => "night has fallen",
            EvaAbortReason::NoSuit => "no EVA suit worn",
            EvaAbortReason::LowOxygen => "suit oxygen low",
            EvaAbortReason::LowWater => "suit water low",
            EvaAbortReason::LifeSupportFailure => "suit life support check failed",
            EvaAbortReason::SuitMalfunction => "suit malfunction",
            EvaAbortReason::LowPerformance => "performance too low",
        }
    }
}

/// True when `amount` has fallen below `fraction` of `capacity`.
pub fn resource_depleted(amount: f64, capacity: f64, fraction: f64) -> bool {
    amount < capacity * fraction
}

/// Evaluate the safety interrupt. `None` means the EVA may continue.
pub fn should_end_eva(conditions: &EvaConditions, limits: &EvaLimits) -> Option<EvaAbortReason> {
    if conditions.solar_irradiance <= 0.0 && !conditions.in_dark_polar_region {
        return Some(EvaAbortReason::Darkness);
    }
    let suit = match conditions.suit {
        Some(suit) => suit,
        None => return Some(EvaAbortReason::NoSuit),
    };
    if resource_depleted(suit.oxygen, suit.oxygen_capacity, limits.min_resource_fraction) {
        return Some(EvaAbortReason::LowOxygen);
    }
    if resource_depleted(suit.water, suit.water_capacity, limits.min_resource_fraction) {
        return Some(EvaAbortReason::LowWater);
    }
    if !suit.life_support_ok {
        return Some(EvaAbortReason::LifeSupportFailure);
    }
    if suit.malfunction {
        return Some(EvaAbortReason::SuitMalfunction);
    }
    if conditions.performance < limits.min_performance {
        return Some(EvaAbortReason::LowPerformance);
    }
    None
}
