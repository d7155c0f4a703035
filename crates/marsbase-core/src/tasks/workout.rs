//! Exercise on a gym machine to work off stress.

use hecs::Entity;
use rand::Rng;

use marsbase_logic::condition::PhysicalCondition;
use marsbase_logic::skills::NaturalAttribute;
use marsbase_logic::weights;

use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::components::Gym;
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Fatigue added per millisol of exercise.
const EXERCISE_FATIGUE_RATE: f64 = 0.5;

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let condition = view.condition()?;
    Ok(weights::workout(condition.stress, condition.fatigue, free_gym(view).is_some()))
}

fn free_gym(view: &TaskView) -> Option<Entity> {
    let settlement = view.settlement()?;
    view.habitable_buildings_with::<Gym>(settlement)
        .into_iter()
        .find(|&b| view.world.get::<&Gym>(b).map(|g| !g.machines.is_full()).unwrap_or(false))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let gym = free_gym(&ctx.view()).ok_or(ClaimError::NoVacancy("gym machine"))?;
    ctx.world.get::<&mut Gym>(gym)?.machines.claim(ctx.person, "gym machine")?;
    let description = format!("Working out in {}", ctx.name_of(gym));
    let duration = ctx.rng.gen_range(20.0..40.0);
    Ok(Task::new(
        TaskKind::Workout,
        TaskState::new(description)
            .effort_driven()
            .with_stress(-0.5)
            .with_duration(duration)
            .with_experience_attribute(NaturalAttribute::Endurance),
        Workout { gym },
    ))
}

pub struct Workout {
    gym: Entity,
}

impl TaskBehavior for Workout {
    fn phase_name(&self) -> &'static str {
        "EXERCISING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        match ctx.world.get::<&mut PhysicalCondition>(ctx.person) {
            Ok(mut condition) => condition.add_fatigue(time * EXERCISE_FATIGUE_RATE),
            Err(_) => state.end_task(),
        }
        0.0
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        if let Ok(mut gym) = ctx.world.get::<&mut Gym>(self.gym) {
            gym.machines.release(ctx.person);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::Slots;
    use hecs::EntityBuilder;

    #[test]
    fn test_needs_a_free_machine() {
        let mut fx = Fixture::new();
        fx.set_stress(20.0);
        fx.set_fatigue(100.0);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        assert!(create(&mut fx.ctx()).is_err());

        let mut functions = EntityBuilder::new();
        functions.add(Gym {
            machines: Slots::new(1),
        });
        let gym = fx.add_building("Gym", true, functions);
        assert_eq!(weight(&fx.view()).unwrap(), 12.0);

        let mut task = create(&mut fx.ctx()).unwrap();
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        fx.step(&mut task, 10.0, None);
        assert!((fx.fatigue() - 105.0).abs() < 1e-9);
        assert!((fx.stress() - 15.0).abs() < 1e-9);

        task.clear_down(&mut fx.ctx());
        assert!(fx.world.get::<&Gym>(gym).unwrap().machines.holders().is_empty());
    }
}
