//! Respond to an emergency malfunction. Only ever started by preemption.

use hecs::Entity;
use log::info;

use marsbase_logic::skills::SkillType;
use marsbase_logic::work::work_rate_modifier;

use super::{unused_time, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::MalfunctionManager;
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Never drawn by the roulette wheel.
pub fn weight(_view: &TaskView) -> Result<f64, ClaimError> {
    Ok(0.0)
}

/// First local building or vehicle with an emergency.
pub fn find_emergency(view: &TaskView) -> Option<Entity> {
    view.local_malfunctionables().into_iter().find(|&e| {
        view.world
            .get::<&MalfunctionManager>(e)
            .map(|m| m.has_emergency_malfunction())
            .unwrap_or(false)
    })
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let entity = find_emergency(&ctx.view()).ok_or(ClaimError::Unavailable("no emergency"))?;
    let description = format!("Emergency repair of {}", ctx.name_of(entity));
    Ok(Task::new(
        TaskKind::RepairEmergencyMalfunction,
        TaskState::new(description)
            .effort_driven()
            .with_stress(2.0)
            .with_skills(&[SkillType::Mechanics]),
        RepairEmergency { entity },
    ))
}

pub struct RepairEmergency {
    entity: Entity,
}

impl TaskBehavior for RepairEmergency {
    fn phase_name(&self) -> &'static str {
        "REPAIRING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let work = work_rate_modifier(ctx.effective_skill(SkillType::Mechanics), time);
        let outcome = match ctx.world.get::<&mut MalfunctionManager>(self.entity) {
            Ok(mut m) if m.has_emergency_malfunction() => {
                let leftover = m.add_emergency_work(work);
                Some((leftover, !m.has_emergency_malfunction()))
            }
            _ => None,
        };
        match outcome {
            Some((_, false)) => 0.0,
            Some((leftover, true)) => {
                info!("{} contained the emergency at {}", ctx.name_of(ctx.person), ctx.name_of(self.entity));
                state.end_task();
                unused_time(time, work, leftover)
            }
            None => {
                state.end_task();
                time
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::Malfunction;
    use hecs::EntityBuilder;

    #[test]
    fn test_clears_emergency_only() {
        let mut fx = Fixture::new();
        assert!(create(&mut fx.ctx()).is_err());
        let hab = fx.add_building("Hab", true, EntityBuilder::new());
        {
            let mut m = fx.world.get::<&mut MalfunctionManager>(hab).unwrap();
            m.malfunctions.push(Malfunction::emergency("Air Leak", 4.0));
        }
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        let mut task = create(&mut fx.ctx()).unwrap();
        // unskilled: half rate
        assert_eq!(fx.step(&mut task, 4.0, None), 0.0);
        assert!(!task.is_done());
        let left = fx.step(&mut task, 10.0, None);
        assert!(task.is_done());
        assert!((left - 6.0).abs() < 1e-9);
        assert!(!fx.world.get::<&MalfunctionManager>(hab).unwrap().has_emergency_malfunction());
    }
}
