//! Work-rate, experience, stress and effort formulas applied on every task tick.

use crate::constants::tasks::{MIN_EFFICIENCY, SKILL_STRESS_MODIFIER};

/// Scale raw work time by skill: unskilled workers are half as fast,
/// each level above one adds 20%.
pub fn work_rate_modifier(skill: i32, work_time: f64) -> f64 {
    if skill <= 0 {
        work_time / 2.0
    } else if skill > 1 {
        work_time * (1.0 + 0.2 * skill as f64)
    } else {
        work_time
    }
}

/// Multiplier contributed by a teacher, 1.0 without one.
pub fn teaching_modifier(teacher: Option<(u32, u8)>) -> f64 {
    match teacher {
        Some((teaching_skill, academic_aptitude)) => {
            1.0 + (teaching_skill as f64 + academic_aptitude as f64) / 100.0
        }
        None => 1.0,
    }
}

/// Experience points earned for `time` millisols of practice.
///
/// `aptitude` is the 0-100 natural attribute that governs learning for
/// the task (50 is neutral).
pub fn experience_gain(time: f64, aptitude: u8, teaching_modifier: f64) -> f64 {
    let base = time / 100.0;
    let aptitude_modifier = 1.0 + (aptitude as f64 - 50.0) / 100.0;
    (base * aptitude_modifier * teaching_modifier).max(0.0)
}

/// Stress change after performing a task for `time` millisols.
///
/// A positive (stressful) modifier is reduced by 10% per effective skill
/// level and never turns into relief.
pub fn stress_delta(stress_modifier: f64, effective_skill: i32, time: f64) -> f64 {
    let mut modifier = stress_modifier;
    if modifier > 0.0 {
        modifier -= modifier * effective_skill.max(0) as f64 * SKILL_STRESS_MODIFIER;
        modifier = modifier.max(0.0);
    }
    modifier * time
}

/// Time actually applied to an effort-driven task. `efficiency` below the
/// floor still makes progress at the floor rate.
pub fn effort_time(time: f64, efficiency: f64, floor: f64) -> f64 {
    let efficiency = if efficiency.is_finite() { efficiency } else { 0.0 };
    time * efficiency.max(floor)
}

/// [`effort_time`] with the default floor.
pub fn default_effort_time(time: f64, efficiency: f64) -> f64 {
    effort_time(time, efficiency, MIN_EFFICIENCY)
}

/// Strength-based carrying multiplier used by hauling tasks.
pub fn strength_modifier(strength: u8) -> f64 {
    strength as f64 / 50.0
}
