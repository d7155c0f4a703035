//! Take a short break indoors.

use rand::Rng;

use marsbase_logic::weights;

use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let condition = view.condition()?;
    Ok(weights::relax(condition.stress, view.is_outside()))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    if ctx.view().is_outside() {
        return Err(ClaimError::Unavailable("cannot relax outside"));
    }
    let duration = ctx.rng.gen_range(10.0..20.0);
    Ok(Task::new(
        TaskKind::Relax,
        TaskState::new("Relaxing").with_stress(-0.5).with_duration(duration),
        Relax,
    ))
}

pub struct Relax;

impl TaskBehavior for Relax {
    fn phase_name(&self) -> &'static str {
        "RELAXING"
    }

    fn perform_phase(&mut self, _ctx: &mut TaskContext, _state: &mut TaskState, _time: f64) -> f64 {
        0.0
    }
}
