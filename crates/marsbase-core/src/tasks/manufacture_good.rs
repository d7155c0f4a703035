//! Run workshop production lines.
//!
//! Work goes to processes already waiting for hands. With none waiting
//! the worker starts the most valuable recipe whose inputs are in stock,
//! claiming every input in one step.

use hecs::{Entity, World};
use log::info;
use rand::Rng;

use marsbase_logic::skills::SkillType;
use marsbase_logic::weights;
use marsbase_logic::work::work_rate_modifier;

use super::{check_for_accident, unused_time, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{Inventory, MalfunctionManager, ManufactureProcess, ProcessTemplate, Workshop};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Working workshops of the settlement with their best recipe value and
/// whether a line is waiting for work.
fn workshops(view: &TaskView) -> Vec<(Entity, f64, bool)> {
    let Some(settlement) = view.settlement() else {
        return Vec::new();
    };
    let Ok(store) = view.world.get::<&Inventory>(settlement) else {
        return Vec::new();
    };
    view.habitable_buildings_with::<Workshop>(settlement)
        .into_iter()
        .filter(|&b| {
            view.world
                .get::<&MalfunctionManager>(b)
                .map(|m| !m.has_malfunction())
                .unwrap_or(true)
        })
        .filter_map(|b| {
            let workshop = view.world.get::<&Workshop>(b).ok()?;
            let best = workshop.best_startable(&store).map(|t| t.value).unwrap_or(0.0);
            Some((b, best, workshop.work_waiting()))
        })
        .collect()
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let shops = workshops(view);
    let best = shops.iter().map(|&(_, v, _)| v).fold(0.0, f64::max);
    let waiting = shops.iter().any(|&(_, _, w)| w);
    Ok(weights::manufacture(best, waiting, view.performance()))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let view = ctx.view();
    let settlement = view.settlement().ok_or(ClaimError::Unavailable("not in a settlement"))?;
    let workshop = workshops(&view)
        .into_iter()
        .filter(|&(_, v, w)| w || v > 0.0)
        .max_by(|a, b| (a.2, a.1).partial_cmp(&(b.2, b.1)).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(b, _, _)| b)
        .ok_or(ClaimError::Unavailable("no production possible"))?;
    let description = format!("Manufacturing in {}", ctx.name_of(workshop));
    let duration = ctx.rng.gen_range(0.0..100.0);
    Ok(Task::new(
        TaskKind::ManufactureGood,
        TaskState::new(description)
            .effort_driven()
            .with_stress(0.1)
            .with_duration(duration)
            .with_skills(&[SkillType::Materials]),
        ManufactureGood { workshop, settlement },
    ))
}

/// Start the best startable recipe, taking all its inputs or none.
pub fn start_process(world: &World, workshop: Entity, store: Entity) -> Result<ProcessTemplate, ClaimError> {
    let template = {
        let shop = world.get::<&Workshop>(workshop)?;
        let inventory = world.get::<&Inventory>(store)?;
        let template = shop
            .best_startable(&inventory)
            .cloned()
            .ok_or(ClaimError::Unavailable("no recipe with inputs in stock"))?;
        template
    };
    {
        let mut inventory = world.get::<&mut Inventory>(store)?;
        if let Some(&(resource, amount)) = template
            .inputs
            .iter()
            .find(|&&(resource, amount)| inventory.amount(resource) < amount)
        {
            return Err(ClaimError::InsufficientResource {
                resource,
                requested: amount,
                available: inventory.amount(resource),
            });
        }
        for &(resource, amount) in &template.inputs {
            inventory.retrieve(resource, amount)?;
        }
    }
    world
        .get::<&mut Workshop>(workshop)?
        .processes
        .push(ManufactureProcess::start(&template));
    Ok(template)
}

pub struct ManufactureGood {
    workshop: Entity,
    settlement: Entity,
}

impl TaskBehavior for ManufactureGood {
    fn phase_name(&self) -> &'static str {
        "MANUFACTURE"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let broken = ctx
            .world
            .get::<&MalfunctionManager>(self.workshop)
            .map(|m| m.has_malfunction())
            .unwrap_or(false);
        if broken {
            info!("{} stops work, {} is malfunctioning", ctx.name_of(ctx.person), ctx.name_of(self.workshop));
            state.end_task();
            return time;
        }

        let waiting = match ctx.world.get::<&Workshop>(self.workshop) {
            Ok(shop) => shop.work_waiting(),
            Err(_) => {
                state.end_task();
                return time;
            }
        };
        if !waiting {
            match start_process(ctx.world, self.workshop, self.settlement) {
                Ok(template) => info!("{} started {}", ctx.name_of(ctx.person), template.name),
                Err(_) => {
                    state.end_task();
                    return time;
                }
            }
        }

        let work = work_rate_modifier(ctx.effective_skill(SkillType::Materials), time);
        let leftover = match ctx.world.get::<&mut Workshop>(self.workshop) {
            Ok(mut shop) => shop.add_work(work),
            Err(_) => work,
        };
        check_for_accident(ctx, self.workshop, SkillType::Materials, time);
        unused_time(time, work, leftover)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::{Malfunction, Resource};
    use hecs::EntityBuilder;

    fn bricks() -> ProcessTemplate {
        ProcessTemplate {
            name: "Make bricks".to_string(),
            inputs: vec![(Resource::Regolith, 10.0), (Resource::Water, 2.0)],
            outputs: vec![(Resource::Bricks, 12.0)],
            work_time: 6.0,
            process_time: 20.0,
            value: 1.5,
        }
    }

    fn add_workshop(fx: &mut Fixture) -> Entity {
        let mut functions = EntityBuilder::new();
        functions.add(Workshop::new(vec![bricks()], 1));
        fx.add_building("Workshop", true, functions)
    }

    #[test]
    fn test_weight_needs_inputs() {
        let mut fx = Fixture::new();
        add_workshop(&mut fx);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        fx.store(Resource::Regolith, 10.0);
        fx.store(Resource::Water, 2.0);
        assert_eq!(weight(&fx.view()).unwrap(), 40.0);
    }

    #[test]
    fn test_start_claims_all_inputs_or_none() {
        let mut fx = Fixture::new();
        let shop = add_workshop(&mut fx);
        fx.store(Resource::Regolith, 10.0);
        fx.store(Resource::Water, 1.0);
        assert!(start_process(&fx.world, shop, fx.settlement).is_err());
        assert_eq!(fx.amount(fx.settlement, Resource::Regolith), 10.0);

        fx.store(Resource::Water, 1.0);
        start_process(&fx.world, shop, fx.settlement).unwrap();
        assert_eq!(fx.amount(fx.settlement, Resource::Regolith), 0.0);
        assert_eq!(fx.amount(fx.settlement, Resource::Water), 0.0);
        assert_eq!(fx.world.get::<&Workshop>(shop).unwrap().processes.len(), 1);
    }

    #[test]
    fn test_works_the_line_then_stops_on_malfunction() {
        let mut fx = Fixture::new();
        fx.config.base_accident_chance = 0.0;
        fx.set_skill(SkillType::Materials, 1);
        let shop = add_workshop(&mut fx);
        fx.store(Resource::Regolith, 10.0);
        fx.store(Resource::Water, 2.0);
        let mut task = create(&mut fx.ctx()).unwrap();
        task.state.duration = None;

        fx.step(&mut task, 4.0, None);
        assert_eq!(fx.world.get::<&Workshop>(shop).unwrap().processes[0].work_remaining, 2.0);

        fx.world
            .get::<&mut MalfunctionManager>(shop)
            .unwrap()
            .malfunctions
            .push(Malfunction::general("Lathe Jam", 5.0));
        assert_eq!(fx.step(&mut task, 4.0, None), 4.0);
        assert!(task.is_done());
    }
}
