//! Service an overdue ground vehicle in a garage bay.

use hecs::{Entity, World};
use log::info;

use marsbase_logic::constants::malfunction::MAINTENANCE_DUE;
use marsbase_logic::skills::SkillType;
use marsbase_logic::weights;
use marsbase_logic::work::work_rate_modifier;

use super::{check_for_accident, unused_time, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{Garage, MalfunctionManager, Settlement, Vehicle};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

const MAINTENANCE_SHIFT: f64 = 50.0;

/// Vehicles parked at the settlement with their time since maintenance.
fn vehicles_due(view: &TaskView) -> Vec<(Entity, f64)> {
    let Some(settlement) = view.settlement() else {
        return Vec::new();
    };
    let parked = view
        .world
        .get::<&Settlement>(settlement)
        .map(|s| s.vehicles.clone())
        .unwrap_or_default();
    parked
        .into_iter()
        .filter_map(|v| {
            let m = view.world.get::<&MalfunctionManager>(v).ok()?;
            (!m.has_malfunction() && m.maintenance_due(MAINTENANCE_DUE))
                .then_some((v, m.effective_time_since_maintenance))
        })
        .collect()
}

fn has_bay_for(view: &TaskView, vehicle: Entity) -> bool {
    let garaged = view
        .world
        .get::<&Vehicle>(vehicle)
        .map(|v| v.garage.is_some())
        .unwrap_or(false);
    garaged || free_garage(view).is_some()
}

fn free_garage(view: &TaskView) -> Option<Entity> {
    let settlement = view.settlement()?;
    view.buildings_with::<Garage>(settlement)
        .into_iter()
        .find(|&g| view.world.get::<&Garage>(g).map(|g| !g.bays.is_full()).unwrap_or(false))
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let times: Vec<f64> = vehicles_due(view)
        .into_iter()
        .filter(|&(v, _)| has_bay_for(view, v))
        .map(|(_, t)| t)
        .collect();
    Ok(weights::maintain_vehicle(&times))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let view = ctx.view();
    let vehicle = vehicles_due(&view)
        .into_iter()
        .filter(|&(v, _)| has_bay_for(&view, v))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(v, _)| v)
        .ok_or(ClaimError::Unavailable("no vehicle due for maintenance"))?;
    let parked_in = ctx.world.get::<&Vehicle>(vehicle)?.garage;
    let garage = match parked_in {
        Some(garage) => garage,
        None => {
            let garage = free_garage(&view).ok_or(ClaimError::NoVacancy("garage bay"))?;
            park(ctx.world, vehicle, garage)?;
            garage
        }
    };
    let description = format!("Maintaining {} in {}", ctx.name_of(vehicle), ctx.name_of(garage));
    Ok(Task::new(
        TaskKind::MaintainGroundVehicleGarage,
        TaskState::new(description)
            .effort_driven()
            .with_stress(0.1)
            .with_duration(MAINTENANCE_SHIFT)
            .with_skills(&[SkillType::Mechanics]),
        MaintainVehicle { vehicle },
    ))
}

/// Claim a bay in `garage` and move the vehicle in.
fn park(world: &World, vehicle: Entity, garage: Entity) -> Result<(), ClaimError> {
    world.get::<&mut Garage>(garage)?.bays.claim(vehicle, "garage bay")?;
    world.get::<&mut Vehicle>(vehicle)?.garage = Some(garage);
    Ok(())
}

pub struct MaintainVehicle {
    vehicle: Entity,
}

impl TaskBehavior for MaintainVehicle {
    fn phase_name(&self) -> &'static str {
        "MAINTAIN_VEHICLE"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let work = work_rate_modifier(ctx.effective_skill(SkillType::Mechanics), time);
        let outcome = match ctx.world.get::<&mut MalfunctionManager>(self.vehicle) {
            Ok(m) if m.has_malfunction() => None,
            Ok(mut m) => {
                let needed = (m.maintenance_work_time - m.maintenance_work_completed).max(0.0);
                Some((m.add_maintenance_work(work), (work - needed).max(0.0)))
            }
            Err(_) => None,
        };
        let Some((completed, leftover)) = outcome else {
            state.end_task();
            return time;
        };
        check_for_accident(ctx, self.vehicle, SkillType::Mechanics, time);
        if completed {
            info!("{} finished servicing {}", ctx.name_of(ctx.person), ctx.name_of(self.vehicle));
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
    use crate::generation::spawn_vehicle;
    use hecs::EntityBuilder;

    fn overdue_rover(fx: &mut Fixture, since: f64) -> Entity {
        let rover = spawn_vehicle(&mut fx.world, fx.settlement, "Rover", &fx.config);
        fx.world
            .get::<&mut MalfunctionManager>(rover)
            .unwrap()
            .effective_time_since_maintenance = since;
        rover
    }

    fn add_garage(fx: &mut Fixture, bays: usize) -> Entity {
        let mut functions = EntityBuilder::new();
        functions.add(Garage::new(bays));
        fx.add_building("Garage", true, functions)
    }

    #[test]
    fn test_weight_needs_overdue_vehicle_and_bay() {
        let mut fx = Fixture::new();
        overdue_rover(&mut fx, 1500.0);
        overdue_rover(&mut fx, 500.0);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        add_garage(&mut fx, 1);
        assert_eq!(weight(&fx.view()).unwrap(), 30.0);
    }

    #[test]
    fn test_moves_vehicle_in_and_services_it() {
        let mut fx = Fixture::new();
        fx.config.base_accident_chance = 0.0;
        fx.set_skill(SkillType::Mechanics, 1);
        let rover = overdue_rover(&mut fx, 2000.0);
        let garage = add_garage(&mut fx, 1);
        let mut task = create(&mut fx.ctx()).unwrap();
        assert_eq!(fx.world.get::<&Vehicle>(rover).unwrap().garage, Some(garage));
        assert!(fx.world.get::<&Garage>(garage).unwrap().bays.holds(rover));

        let needed = fx.world.get::<&MalfunctionManager>(rover).unwrap().maintenance_work_time;
        fx.world
            .get::<&mut MalfunctionManager>(rover)
            .unwrap()
            .maintenance_work_completed = needed - 4.0;
        let left = fx.step(&mut task, 10.0, None);
        assert!(task.is_done());
        assert!((left - 6.0).abs() < 1e-9);
        let m = fx.world.get::<&MalfunctionManager>(rover).unwrap();
        assert_eq!(m.effective_time_since_maintenance, 0.0);
    }
}
