//! Sleep until rested, in a bed when one is free.

use hecs::Entity;
use log::debug;
use rand::Rng;

use marsbase_logic::condition::PhysicalCondition;
use marsbase_logic::weights;

use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::components::Quarters;
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Fatigue shed per millisol asleep.
const FATIGUE_RECOVERY_RATE: f64 = 1.7;
/// Extra recovery proportional to how tired the sleeper still is.
const FATIGUE_RECOVERY_FRACTION: f64 = 0.005;

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let condition = view.condition()?;
    Ok(weights::sleep(condition.fatigue, view.is_dark(), view.is_outside()))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    if ctx.view().is_outside() {
        return Err(ClaimError::Unavailable("cannot sleep outside"));
    }
    let quarters = claim_bed(ctx);
    let description = match quarters {
        Some(q) => format!("Sleeping in {}", ctx.name_of(q)),
        None => "Sleeping".to_string(),
    };
    let duration = ctx.rng.gen_range(250.0..330.0);
    Ok(Task::new(
        TaskKind::Sleep,
        TaskState::new(description).with_stress(-2.2).with_duration(duration),
        Sleep { quarters },
    ))
}

fn claim_bed(ctx: &mut TaskContext) -> Option<Entity> {
    let view = ctx.view();
    let settlement = view.settlement()?;
    let candidates = view.habitable_buildings_with::<Quarters>(settlement);
    let person = ctx.person;
    candidates.into_iter().find(|&building| {
        ctx.world
            .get::<&mut Quarters>(building)
            .map(|mut q| q.beds.claim(person, "bed").is_ok())
            .unwrap_or(false)
    })
}

pub struct Sleep {
    quarters: Option<Entity>,
}

impl TaskBehavior for Sleep {
    fn phase_name(&self) -> &'static str {
        "SLEEPING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let rested = match ctx.world.get::<&mut PhysicalCondition>(ctx.person) {
            Ok(mut condition) => {
                let recovery = time * FATIGUE_RECOVERY_RATE + condition.fatigue * FATIGUE_RECOVERY_FRACTION;
                condition.reduce_fatigue(recovery);
                condition.fatigue <= 0.0
            }
            Err(_) => true,
        };
        if rested {
            debug!("{} woke up rested", ctx.name_of(ctx.person));
            state.end_task();
        }
        0.0
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        if let Some(quarters) = self.quarters.take() {
            if let Ok(mut q) = ctx.world.get::<&mut Quarters>(quarters) {
                q.beds.release(ctx.person);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::{LocationSituation, Slots};
    use crate::surface::FixedSurface;
    use hecs::EntityBuilder;

    fn add_quarters(fx: &mut Fixture, beds: usize) -> Entity {
        let mut functions = EntityBuilder::new();
        functions.add(Quarters { beds: Slots::new(beds) });
        fx.add_building("Hab", true, functions)
    }

    #[test]
    fn test_weight_follows_fatigue_and_darkness() {
        let mut fx = Fixture::new();
        fx.set_fatigue(400.0);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        fx.set_fatigue(900.0);
        assert_eq!(weight(&fx.view()).unwrap(), 100.0);
        fx.surface = FixedSurface::night();
        assert_eq!(weight(&fx.view()).unwrap(), 200.0);
        fx.set_situation(LocationSituation::Outside);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_sleeps_in_bed_and_frees_it() {
        let mut fx = Fixture::new();
        let hab = add_quarters(&mut fx, 1);
        fx.set_fatigue(100.0);
        let mut task = create(&mut fx.ctx()).unwrap();
        assert!(fx.world.get::<&Quarters>(hab).unwrap().beds.holds(fx.person));

        // someone else finds the only bed taken
        let other = fx.add_person("Other");
        let mut second = create(&mut fx.ctx_for(other)).unwrap();
        assert_eq!(second.description(), "Sleeping");
        second.clear_down(&mut fx.ctx_for(other));

        for _ in 0..100 {
            fx.step(&mut task, 10.0, None);
            if task.is_done() {
                break;
            }
        }
        assert!(task.is_done());
        assert_eq!(fx.fatigue(), 0.0);
        task.clear_down(&mut fx.ctx());
        assert!(!fx.world.get::<&Quarters>(hab).unwrap().beds.holds(fx.person));
    }

    #[test]
    fn test_recovery_rate() {
        let mut fx = Fixture::new();
        fx.set_fatigue(1000.0);
        let mut task = create(&mut fx.ctx()).unwrap();
        fx.step(&mut task, 10.0, None);
        // 10 x 1.7 + 1000 x 0.005
        assert!((fx.fatigue() - 978.0).abs() < 1e-9);
        assert!(fx.stress() == 0.0);
    }
}
