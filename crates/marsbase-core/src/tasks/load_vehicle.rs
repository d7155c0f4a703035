//! Load a garaged vehicle from settlement storage according to its manifest.

use hecs::Entity;
use log::{info, warn};

use marsbase_logic::skills::NaturalAttribute;
use marsbase_logic::weights;
use marsbase_logic::work::strength_modifier;

use super::{unused_time, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{transfer, Inventory, LoadingManifest, Resource, Settlement, Vehicle};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// kg an average colonist shifts every four millisols.
const LOADING_RATE: f64 = 20.0;

/// Mass still loadable into `vehicle` from `settlement` storage.
fn loadable_mass(view: &TaskView, vehicle: Entity, settlement: Entity) -> f64 {
    let Ok(manifest) = view.world.get::<&LoadingManifest>(vehicle) else {
        return 0.0;
    };
    let (Ok(cargo), Ok(storage)) = (
        view.world.get::<&Inventory>(vehicle),
        view.world.get::<&Inventory>(settlement),
    ) else {
        return 0.0;
    };
    manifest.loadable_mass(&cargo, &storage)
}

/// The garaged vehicle with the most cargo waiting, and that mass.
fn best_vehicle(view: &TaskView) -> Option<(Entity, f64)> {
    let settlement = view.settlement()?;
    let vehicles = view.world.get::<&Settlement>(settlement).ok()?.vehicles.clone();
    vehicles
        .into_iter()
        .filter(|&v| {
            view.world
                .get::<&Vehicle>(v)
                .map(|v| v.garage.is_some())
                .unwrap_or(false)
        })
        .map(|v| (v, loadable_mass(view, v, settlement)))
        .filter(|&(_, mass)| mass > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    Ok(weights::load_vehicle(best_vehicle(view).map(|(_, m)| m).unwrap_or(0.0)))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let view = ctx.view();
    let settlement = view.settlement().ok_or(ClaimError::Unavailable("not in a settlement"))?;
    let (vehicle, _) = best_vehicle(&view).ok_or(ClaimError::Unavailable("nothing to load"))?;
    let description = format!("Loading {}", ctx.name_of(vehicle));
    Ok(Task::new(
        TaskKind::LoadVehicleGarage,
        TaskState::new(description).effort_driven().with_stress(0.1),
        LoadVehicle { vehicle, settlement },
    ))
}

pub struct LoadVehicle {
    vehicle: Entity,
    settlement: Entity,
}

impl LoadVehicle {
    fn next_item(&self, ctx: &TaskContext) -> Option<(Resource, f64)> {
        let manifest = ctx.world.get::<&LoadingManifest>(self.vehicle).ok()?;
        let cargo = ctx.world.get::<&Inventory>(self.vehicle).ok()?;
        let storage = ctx.world.get::<&Inventory>(self.settlement).ok()?;
        manifest.next_item(&cargo, &storage)
    }
}

impl TaskBehavior for LoadVehicle {
    fn phase_name(&self) -> &'static str {
        "LOADING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let garaged = ctx
            .world
            .get::<&Vehicle>(self.vehicle)
            .map(|v| v.garage.is_some())
            .unwrap_or(false);
        if !garaged {
            state.end_task();
            return time;
        }

        let strength = ctx.view().attribute(NaturalAttribute::Strength);
        let capacity = LOADING_RATE * strength_modifier(strength) * time / 4.0;
        let mut left = capacity;
        while left > 0.0 {
            let Some((resource, amount)) = self.next_item(ctx) else {
                break;
            };
            match transfer(ctx.world, self.settlement, self.vehicle, resource, amount.min(left)) {
                Ok(moved) if moved > 0.0 => left -= moved,
                Ok(_) => break,
                Err(e) => {
                    warn!("loading {} stalled: {}", ctx.name_of(self.vehicle), e);
                    break;
                }
            }
        }

        if self.next_item(ctx).is_none() {
            let loaded = ctx
                .world
                .get::<&LoadingManifest>(self.vehicle)
                .ok()
                .zip(ctx.world.get::<&Inventory>(self.vehicle).ok())
                .map(|(manifest, cargo)| manifest.is_loaded(&cargo))
                .unwrap_or(false);
            info!(
                "{} done loading {}{}",
                ctx.name_of(ctx.person),
                ctx.name_of(self.vehicle),
                if loaded { "" } else { ", storage ran short" }
            );
            state.end_task();
            return unused_time(time, capacity, left);
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::Garage;
    use crate::generation::spawn_vehicle;
    use hecs::EntityBuilder;

    fn garaged_rover(fx: &mut Fixture, manifest: Vec<(Resource, f64)>) -> Entity {
        let rover = spawn_vehicle(&mut fx.world, fx.settlement, "Rover", &fx.config);
        let mut functions = EntityBuilder::new();
        functions.add(Garage::new(1));
        let garage = fx.add_building("Garage", true, functions);
        fx.world.get::<&mut Garage>(garage).unwrap().bays.claim(rover, "bay").unwrap();
        fx.world.get::<&mut Vehicle>(rover).unwrap().garage = Some(garage);
        fx.world
            .insert_one(rover, LoadingManifest { resources: manifest })
            .unwrap();
        rover
    }

    #[test]
    fn test_weight_needs_supplies() {
        let mut fx = Fixture::new();
        garaged_rover(&mut fx, vec![(Resource::Food, 30.0)]);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        fx.store(Resource::Food, 100.0);
        assert_eq!(weight(&fx.view()).unwrap(), 50.0);
    }

    #[test]
    fn test_ungaraged_vehicle_is_ignored() {
        let mut fx = Fixture::new();
        let rover = garaged_rover(&mut fx, vec![(Resource::Food, 30.0)]);
        fx.store(Resource::Food, 100.0);
        fx.world.get::<&mut Vehicle>(rover).unwrap().garage = None;
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        assert!(create(&mut fx.ctx()).is_err());
    }

    #[test]
    fn test_loads_at_carrying_rate_until_done() {
        let mut fx = Fixture::new();
        let rover = garaged_rover(&mut fx, vec![(Resource::Food, 15.0), (Resource::Water, 5.0)]);
        fx.store(Resource::Food, 100.0);
        fx.store(Resource::Water, 100.0);
        let mut task = create(&mut fx.ctx()).unwrap();

        // average strength: 5 kg per millisol
        assert_eq!(fx.step(&mut task, 2.0, None), 0.0);
        assert_eq!(fx.amount(rover, Resource::Food), 10.0);
        fx.step(&mut task, 2.0, None);
        assert_eq!(fx.amount(rover, Resource::Food), 15.0);
        assert_eq!(fx.amount(rover, Resource::Water), 5.0);
        assert!(task.is_done());
        assert_eq!(fx.amount(fx.settlement, Resource::Food), 85.0);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
    }
}
