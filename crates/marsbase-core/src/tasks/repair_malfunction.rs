//! Fix a general malfunction on a nearby building or vehicle.
//!
//! Repairs that need parts draw them from the local store on the first
//! tick of work. Losing that race to another repairer ends the task.

use hecs::Entity;
use log::info;
use rand::Rng;

use marsbase_logic::skills::SkillType;
use marsbase_logic::weights;
use marsbase_logic::work::work_rate_modifier;

use super::{check_for_accident, unused_time, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{Inventory, MalfunctionManager};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

fn malfunctioning(view: &TaskView) -> Vec<Entity> {
    view.local_malfunctionables()
        .into_iter()
        .filter(|&e| {
            view.world
                .get::<&MalfunctionManager>(e)
                .map(|m| m.has_general_malfunction())
                .unwrap_or(false)
        })
        .collect()
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    Ok(weights::repair_malfunction(malfunctioning(view).len(), view.performance()))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let view = ctx.view();
    let entity = malfunctioning(&view)
        .first()
        .copied()
        .ok_or(ClaimError::Unavailable("nothing to repair"))?;
    let store = view.local_inventory();
    let description = format!("Repairing {}", ctx.name_of(entity));
    let duration = ctx.rng.gen_range(25.0..35.0);
    Ok(Task::new(
        TaskKind::RepairMalfunction,
        TaskState::new(description)
            .effort_driven()
            .with_stress(0.3)
            .with_duration(duration)
            .with_skills(&[SkillType::Mechanics]),
        RepairMalfunction { entity, store },
    ))
}

pub struct RepairMalfunction {
    entity: Entity,
    store: Option<Entity>,
}

impl RepairMalfunction {
    /// Take the parts the next repair needs from the local store.
    fn fit_parts(&self, ctx: &mut TaskContext) -> Result<(), ClaimError> {
        let needed = ctx.world.get::<&MalfunctionManager>(self.entity)?.parts_needed();
        let Some((resource, amount)) = needed else {
            return Ok(());
        };
        let store = self.store.ok_or(ClaimError::Unavailable("no parts store"))?;
        ctx.world.get::<&mut Inventory>(store)?.retrieve(resource, amount)?;
        ctx.world.get::<&mut MalfunctionManager>(self.entity)?.fit_parts();
        Ok(())
    }
}

impl TaskBehavior for RepairMalfunction {
    fn phase_name(&self) -> &'static str {
        "REPAIRING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let broken = ctx
            .world
            .get::<&MalfunctionManager>(self.entity)
            .map(|m| m.has_general_malfunction())
            .unwrap_or(false);
        if !broken {
            state.end_task();
            return time;
        }
        if let Err(e) = self.fit_parts(ctx) {
            info!("{} cannot repair {}: {}", ctx.name_of(ctx.person), ctx.name_of(self.entity), e);
            state.end_task();
            return time;
        }

        let work = work_rate_modifier(ctx.effective_skill(SkillType::Mechanics), time);
        let (leftover, fixed) = match ctx.world.get::<&mut MalfunctionManager>(self.entity) {
            Ok(mut m) => {
                let leftover = m.add_general_work(work);
                (leftover, !m.has_general_malfunction())
            }
            Err(_) => (work, true),
        };
        check_for_accident(ctx, self.entity, SkillType::Mechanics, time);
        if fixed {
            info!("{} repaired {}", ctx.name_of(ctx.person), ctx.name_of(self.entity));
            state.end_task();
            return unused_time(time, work, leftover);
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::{Malfunction, Resource};
    use hecs::EntityBuilder;

    fn broken_building(fx: &mut Fixture, malfunction: Malfunction) -> Entity {
        let building = fx.add_building("Workshop", true, EntityBuilder::new());
        fx.world
            .get::<&mut MalfunctionManager>(building)
            .unwrap()
            .malfunctions
            .push(malfunction);
        building
    }

    #[test]
    fn test_weight_counts_local_malfunctions() {
        let mut fx = Fixture::new();
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        broken_building(&mut fx, Malfunction::general("Pump Failure", 10.0));
        broken_building(&mut fx, Malfunction::general("Pump Failure", 10.0));
        assert_eq!(weight(&fx.view()).unwrap(), 100.0);
        fx.set_performance(0.5);
        assert_eq!(weight(&fx.view()).unwrap(), 50.0);
    }

    #[test]
    fn test_repair_uses_parts_and_fixes() {
        let mut fx = Fixture::new();
        fx.config.base_accident_chance = 0.0;
        fx.set_skill(SkillType::Mechanics, 1);
        fx.store(Resource::SpareParts, 5.0);
        let mut malfunction = Malfunction::general("Pump Failure", 8.0);
        malfunction.parts_needed = Some((Resource::SpareParts, 2.0));
        let building = broken_building(&mut fx, malfunction);

        let mut task = create(&mut fx.ctx()).unwrap();
        assert_eq!(fx.step(&mut task, 5.0, None), 0.0);
        assert_eq!(fx.amount(fx.settlement, Resource::SpareParts), 3.0);
        let left = fx.step(&mut task, 5.0, None);
        assert!(task.is_done());
        assert!((left - 2.0).abs() < 1e-9);
        assert!(!fx.world.get::<&MalfunctionManager>(building).unwrap().has_malfunction());
    }

    #[test]
    fn test_missing_parts_end_the_task() {
        let mut fx = Fixture::new();
        let mut malfunction = Malfunction::general("Pump Failure", 8.0);
        malfunction.parts_needed = Some((Resource::SpareParts, 2.0));
        let building = broken_building(&mut fx, malfunction);
        let mut task = create(&mut fx.ctx()).unwrap();
        assert_eq!(fx.step(&mut task, 5.0, None), 5.0);
        assert!(task.is_done());
        assert!(fx.world.get::<&MalfunctionManager>(building).unwrap().has_malfunction());
    }
}
