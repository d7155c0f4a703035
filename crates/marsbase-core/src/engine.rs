//! Colony engine - owns the world and advances it one tick at a time

use hecs::{Entity, World};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use marsbase_logic::condition::PhysicalCondition;
use marsbase_logic::constants::eva::{OXYGEN_USE_RATE, WATER_USE_RATE};

use crate::clock::MarsClock;
use crate::components::*;
use crate::config::{ConfigError, EngineConfig};
use crate::context::{entity_name, TaskContext};
use crate::generation::{generate_colony, ColonyLayout, ColonySpec};
use crate::surface::{MarsSurface, SurfaceFeatures};
use crate::tasks::{TaskKind, TaskManager, TaskRegistry};

/// A colonist driven by the engine, with their own task stack.
pub struct Colonist {
    pub entity: Entity,
    pub manager: TaskManager,
}

/// Main simulation engine
pub struct ColonyEngine {
    /// ECS world holding the colony
    pub world: World,
    colonists: Vec<Colonist>,
    registry: TaskRegistry,
    surface: Box<dyn SurfaceFeatures>,
    rng: StdRng,
    config: EngineConfig,
    clock: MarsClock,
    layout: ColonyLayout,
}

impl ColonyEngine {
    /// An empty world with the standard task registry.
    pub fn new(config: EngineConfig, surface: Box<dyn SurfaceFeatures>) -> Self {
        Self {
            world: World::new(),
            colonists: Vec::new(),
            registry: TaskRegistry::standard(),
            surface,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            clock: MarsClock::default(),
            layout: ColonyLayout::default(),
        }
    }

    /// Generate the colony described by `spec` under the default sun model.
    pub fn from_spec(spec: &ColonySpec, config: EngineConfig) -> Result<Self, ConfigError> {
        Self::from_spec_with_surface(spec, config, Box::new(MarsSurface::default()))
    }

    pub fn from_spec_with_surface(
        spec: &ColonySpec,
        config: EngineConfig,
        surface: Box<dyn SurfaceFeatures>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut engine = Self::new(config, surface);
        let layout = generate_colony(&mut engine.world, spec, &engine.config, &mut engine.rng)?;
        for &person in &layout.people {
            engine.add_colonist(person);
        }
        engine.layout = layout;
        Ok(engine)
    }

    /// Swap the task registry, e.g. for a reduced catalogue in tests.
    pub fn with_registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Start the clock at a given time of day.
    pub fn with_clock(mut self, clock: MarsClock) -> Self {
        self.clock = clock;
        self
    }

    /// Put a spawned person under engine control. Ticked in insertion order.
    pub fn add_colonist(&mut self, person: Entity) {
        if self.colonists.iter().any(|c| c.entity == person) {
            return;
        }
        self.colonists.push(Colonist {
            entity: person,
            manager: TaskManager::new(),
        });
    }

    /// Advance the colony by `time` millisols.
    pub fn update(&mut self, time: f64) {
        if !time.is_finite() || time <= 0.0 {
            return;
        }
        let sol = self.clock.sol();
        self.clock.advance(time);
        if self.clock.sol() != sol {
            info!("Sol {} begins", self.clock.sol());
        }

        self.airlocks_system(time);
        self.malfunction_system(time);
        self.production_system(time);
        self.condition_system(time);
        self.task_system(time);
    }

    fn airlocks_system(&mut self, time: f64) {
        for (_, airlock) in self.world.query_mut::<&mut Airlock>() {
            airlock.add_time(time);
        }
    }

    fn malfunction_system(&mut self, time: f64) {
        let mut struck = Vec::new();
        for (entity, malfunctions) in self.world.query_mut::<&mut MalfunctionManager>() {
            malfunctions.time_passing(time, self.config.wear_rate);
            if let Some(m) = malfunctions.check_random_failure(time, self.config.malfunction_rate, &mut self.rng) {
                struck.push((entity, m.name.clone()));
            }
        }
        for (entity, name) in struck {
            info!("{} suffered {}", entity_name(&self.world, entity), name);
        }
    }

    /// Crops grow needier and finished workshop batches land in storage.
    fn production_system(&mut self, time: f64) {
        for (_, greenhouse) in self.world.query_mut::<&mut Greenhouse>() {
            greenhouse.time_passing(time);
        }

        let mut finished = Vec::new();
        for (_, (building, workshop)) in self.world.query_mut::<(&Building, &mut Workshop)>() {
            for process in workshop.time_passing(time) {
                finished.push((building.settlement, process));
            }
        }
        for (settlement, process) in finished {
            let Ok(mut storage) = self.world.get::<&mut Inventory>(settlement) else {
                continue;
            };
            for &(resource, amount) in &process.template.outputs {
                let stored = storage.store_up_to(resource, amount);
                if stored < amount {
                    warn!(
                        "{}: no room for {:.1} kg of {}",
                        process.template.name,
                        amount - stored,
                        resource.name()
                    );
                }
            }
            debug!("{} finished", process.template.name);
        }
    }

    fn condition_system(&mut self, time: f64) {
        let rates = self.config.condition_rates();
        let mut outside = Vec::new();
        for (entity, (condition, location)) in self.world.query_mut::<(&mut PhysicalCondition, &Location)>() {
            condition.time_passing(time, &rates);
            if location.is_outside() {
                outside.push(entity);
            }
        }
        for person in outside {
            let Some(suit) = find_suit(&self.world, person) else {
                continue;
            };
            if let Ok(mut tanks) = self.world.get::<&mut Inventory>(suit) {
                tanks.retrieve_up_to(Resource::Oxygen, OXYGEN_USE_RATE * time);
                tanks.retrieve_up_to(Resource::Water, WATER_USE_RATE * time);
            }
        }
    }

    fn task_system(&mut self, time: f64) {
        for colonist in &mut self.colonists {
            let efficiency = match self.world.get::<&PhysicalCondition>(colonist.entity) {
                Ok(condition) => condition.performance(),
                Err(_) => continue,
            };
            let mut ctx = TaskContext {
                world: &mut self.world,
                surface: self.surface.as_ref(),
                rng: &mut self.rng,
                config: &self.config,
                clock: self.clock,
                person: colonist.entity,
            };
            colonist.manager.perform_task(&mut ctx, &self.registry, time, efficiency);
        }
    }

    pub fn clock(&self) -> MarsClock {
        self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout(&self) -> &ColonyLayout {
        &self.layout
    }

    pub fn colonists(&self) -> &[Colonist] {
        &self.colonists
    }

    pub fn manager(&self, person: Entity) -> Option<&TaskManager> {
        self.colonists
            .iter()
            .find(|c| c.entity == person)
            .map(|c| &c.manager)
    }

    /// Count total people in the world
    pub fn person_count(&self) -> usize {
        self.world.query::<&Person>().iter().count()
    }

    /// Colonists whose current top-level task is `kind`
    pub fn count_doing(&self, kind: TaskKind) -> usize {
        self.colonists
            .iter()
            .filter(|c| c.manager.current_task().map(|t| t.kind()) == Some(kind))
            .count()
    }

    /// Count people outside on the surface
    pub fn outside_count(&self) -> usize {
        self.world
            .query::<(&Person, &Location)>()
            .iter()
            .filter(|(_, (_, location))| location.is_outside())
            .count()
    }

    /// Entities with a malfunction waiting for repair
    pub fn malfunction_count(&self) -> usize {
        self.world
            .query::<&MalfunctionManager>()
            .iter()
            .filter(|(_, m)| m.has_malfunction())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::FixedSurface;

    const SCENARIO: &str = r#"{
        "name": "Test Base",
        "stock": [ { "resource": "Food", "amount": 100.0 }, { "resource": "Water", "amount": 50.0 } ],
        "buildings": [
            { "name": "Hab", "functions": [ { "type": "Quarters", "beds": 4 } ] },
            { "name": "Farm", "functions": [ { "type": "Greenhouse", "crops": ["Potato"], "need_rate": 0.1 } ] }
        ],
        "people": [ { "name": "Ada Novak" }, { "name": "Ben Okafor" } ]
    }"#;

    fn quiet_config() -> EngineConfig {
        EngineConfig {
            malfunction_rate: 0.0,
            base_accident_chance: 0.0,
            ..Default::default()
        }
    }

    fn engine() -> ColonyEngine {
        let spec = ColonySpec::from_json_str(SCENARIO).unwrap();
        ColonyEngine::from_spec_with_surface(&spec, quiet_config(), Box::new(FixedSurface::daylight())).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = ColonyEngine::new(EngineConfig::default(), Box::new(MarsSurface::default()));
        assert_eq!(engine.person_count(), 0);
        assert_eq!(engine.clock().total_millisols(), 0.0);
    }

    #[test]
    fn test_from_spec_registers_colonists() {
        let engine = engine();
        assert_eq!(engine.person_count(), 2);
        assert_eq!(engine.colonists().len(), 2);
        assert!(engine.layout().settlement.is_some());
    }

    #[test]
    fn test_update_advances_clock_and_starts_tasks() {
        let mut engine = engine();
        engine.update(1.0);
        assert_eq!(engine.clock().total_millisols(), 1.0);
        for colonist in engine.colonists() {
            // a short task may start and finish inside the first tick
            let manager = &colonist.manager;
            assert!(manager.has_active_task() || manager.last_task().is_some());
            if manager.has_active_task() {
                let activity = engine.world.get::<&Activity>(colonist.entity).unwrap();
                assert!(activity.kind.is_some());
            }
        }
    }

    #[test]
    fn test_bad_tick_is_ignored() {
        let mut engine = engine();
        engine.update(f64::NAN);
        engine.update(-3.0);
        assert_eq!(engine.clock().total_millisols(), 0.0);
    }

    #[test]
    fn test_time_ages_condition_and_crops() {
        let mut engine = engine();
        let farm = engine.layout().buildings[1];
        engine.production_system(10.0);
        engine.condition_system(10.0);
        assert!((engine.world.get::<&Greenhouse>(farm).unwrap().outstanding_work() - 1.0).abs() < 1e-9);
        let someone = engine.colonists()[0].entity;
        assert!(engine.world.get::<&PhysicalCondition>(someone).unwrap().hunger > 0.0);
    }

    #[test]
    fn test_finished_batch_lands_in_storage() {
        let mut engine = engine();
        let settlement = engine.layout().settlement.unwrap();
        let template = ProcessTemplate {
            name: "Smelt".to_string(),
            inputs: vec![],
            outputs: vec![(Resource::SpareParts, 2.0)],
            work_time: 0.0,
            process_time: 5.0,
            value: 1.0,
        };
        let mut workshop = Workshop::new(vec![template.clone()], 1);
        workshop.processes.push(ManufactureProcess::start(&template));
        engine.world.spawn((
            Building {
                name: "Shop".to_string(),
                settlement,
                life_support: true,
            },
            workshop,
        ));
        engine.production_system(6.0);
        assert_eq!(engine.world.get::<&Inventory>(settlement).unwrap().amount(Resource::SpareParts), 2.0);
    }

    #[test]
    fn test_outside_draws_on_suit() {
        let mut engine = engine();
        let person = engine.colonists()[0].entity;
        let suit = crate::generation::spawn_suit(&mut engine.world, person);
        {
            let mut tanks = engine.world.get::<&mut Inventory>(suit).unwrap();
            tanks.store(Resource::Oxygen, 1.0).unwrap();
        }
        engine.world.get::<&mut Location>(person).unwrap().situation = LocationSituation::Outside;
        engine.condition_system(100.0);
        let left = engine.world.get::<&Inventory>(suit).unwrap().amount(Resource::Oxygen);
        assert!((left - (1.0 - OXYGEN_USE_RATE * 100.0)).abs() < 1e-9);
    }
}
