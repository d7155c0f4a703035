//! People-related components: Person, Activity, HealthProblem.
//!
//! A colonist entity carries `Person`, `Name`, `Location`,
//! `PhysicalCondition`, `SkillManager`, `NaturalAttributes`, `Inventory`
//! (worn suit, carried containers) and `Activity`.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::tasks::TaskKind;

/// Marker component identifying an entity as a person
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Person;

/// What a person is visibly doing, republished after every tick.
///
/// Other agents read this instead of reaching into a task stack they do
/// not own. A teacher attaches itself here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Activity {
    /// Kind of the bottom (top-level) task, `None` when idle.
    pub kind: Option<TaskKind>,
    /// Kind of the task actually running, the top of the stack.
    pub active: Option<TaskKind>,
    pub phase: &'static str,
    pub description: String,
    pub teacher: Option<Entity>,
}

impl Activity {
    pub fn is_idle(&self) -> bool {
        self.kind.is_none()
    }

    /// A student accepts a teacher only for work that trains skills.
    pub fn is_teachable(&self) -> bool {
        self.teacher.is_none() && self.kind.map(|k| k.is_teachable()).unwrap_or(false)
    }
}

/// A complaint waiting for, or receiving, treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthProblem {
    pub name: String,
    pub treatment_remaining: f64,
    /// Set while a doctor is treating this problem.
    #[serde(skip)]
    pub doctor: Option<Entity>,
    pub cured: bool,
}

impl HealthProblem {
    pub fn new(name: impl Into<String>, treatment_time: f64) -> Self {
        Self {
            name: name.into(),
            treatment_remaining: treatment_time.max(0.0),
            doctor: None,
            cured: false,
        }
    }

    pub fn awaiting_treatment(&self) -> bool {
        !self.cured && self.doctor.is_none()
    }

    /// Apply treatment work, returning the unused part.
    pub fn treat(&mut self, work: f64) -> f64 {
        let used = work.max(0.0).min(self.treatment_remaining);
        self.treatment_remaining -= used;
        if self.treatment_remaining <= 0.0 {
            self.treatment_remaining = 0.0;
            self.cured = true;
            self.doctor = None;
        }
        work - used
    }
}
