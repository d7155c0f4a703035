//! Shared test fixture: one settlement, one colonist, daylight.

use hecs::{Entity, EntityBuilder, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use marsbase_logic::condition::PhysicalCondition;
use marsbase_logic::skills::{NaturalAttributes, SkillManager, SkillType};

use super::Task;
use crate::clock::MarsClock;
use crate::components::{Airlock, Inventory, Location, LocationSituation, Name, Resource};
use crate::config::EngineConfig;
use crate::context::{TaskContext, TaskView};
use crate::generation::{spawn_building, spawn_person, spawn_settlement, spawn_suit};
use crate::surface::{Coordinates, FixedSurface};

pub(crate) struct Fixture {
    pub world: World,
    pub surface: FixedSurface,
    pub rng: StdRng,
    pub config: EngineConfig,
    pub clock: MarsClock,
    pub settlement: Entity,
    pub person: Entity,
}

impl Fixture {
    pub fn new() -> Self {
        let mut world = World::new();
        let settlement = spawn_settlement(&mut world, "Base", Coordinates::default(), 8, 1000.0);
        let person = spawn_person(
            &mut world,
            settlement,
            Name::new("Tester"),
            SkillManager::default(),
            NaturalAttributes::default(),
            PhysicalCondition::default(),
        );
        Self {
            world,
            surface: FixedSurface::daylight(),
            rng: StdRng::seed_from_u64(11),
            config: EngineConfig::default(),
            clock: MarsClock::new(500.0),
            settlement,
            person,
        }
    }

    pub fn ctx(&mut self) -> TaskContext<'_> {
        TaskContext {
            world: &mut self.world,
            surface: &self.surface,
            rng: &mut self.rng,
            config: &self.config,
            clock: self.clock,
            person: self.person,
        }
    }

    /// Context acting for someone other than the fixture's colonist.
    pub fn ctx_for(&mut self, person: Entity) -> TaskContext<'_> {
        let mut ctx = self.ctx();
        ctx.person = person;
        ctx
    }

    pub fn view(&self) -> TaskView<'_> {
        TaskView {
            world: &self.world,
            surface: &self.surface,
            config: &self.config,
            clock: self.clock,
            person: self.person,
        }
    }

    pub fn add_person(&mut self, name: &str) -> Entity {
        spawn_person(
            &mut self.world,
            self.settlement,
            Name::new(name),
            SkillManager::default(),
            NaturalAttributes::default(),
            PhysicalCondition::default(),
        )
    }

    pub fn add_building(&mut self, name: &str, life_support: bool, functions: EntityBuilder) -> Entity {
        spawn_building(&mut self.world, self.settlement, name, life_support, functions)
    }

    pub fn add_airlock(&mut self) -> Entity {
        let mut functions = EntityBuilder::new();
        functions.add(Airlock::new(2));
        self.add_building("Airlock", true, functions)
    }

    /// An empty suit hanging in settlement storage.
    pub fn add_suit(&mut self) -> Entity {
        spawn_suit(&mut self.world, self.settlement)
    }

    /// A full suit worn by the colonist.
    pub fn wear_suit(&mut self) -> Entity {
        let suit = spawn_suit(&mut self.world, self.person);
        let mut inventory = self.world.get::<&mut Inventory>(suit).unwrap();
        inventory.store(Resource::Oxygen, 1.0).unwrap();
        inventory.store(Resource::Water, 4.0).unwrap();
        drop(inventory);
        suit
    }

    pub fn store(&mut self, resource: Resource, amount: f64) {
        self.world
            .get::<&mut Inventory>(self.settlement)
            .unwrap()
            .store(resource, amount)
            .unwrap();
    }

    pub fn amount(&self, holder: Entity, resource: Resource) -> f64 {
        self.world.get::<&Inventory>(holder).unwrap().amount(resource)
    }

    pub fn set_situation(&mut self, situation: LocationSituation) {
        self.world.get::<&mut Location>(self.person).unwrap().situation = situation;
    }

    pub fn set_performance(&mut self, performance: f64) {
        self.condition_mut(|c| c.set_performance(performance));
    }

    pub fn set_stress(&mut self, stress: f64) {
        self.condition_mut(|c| c.stress = stress);
    }

    pub fn set_fatigue(&mut self, fatigue: f64) {
        self.condition_mut(|c| c.fatigue = fatigue);
    }

    pub fn set_hunger(&mut self, hunger: f64) {
        self.condition_mut(|c| c.hunger = hunger);
    }

    pub fn stress(&self) -> f64 {
        self.world.get::<&PhysicalCondition>(self.person).unwrap().stress
    }

    pub fn fatigue(&self) -> f64 {
        self.world.get::<&PhysicalCondition>(self.person).unwrap().fatigue
    }

    pub fn hunger(&self) -> f64 {
        self.world.get::<&PhysicalCondition>(self.person).unwrap().hunger
    }

    pub fn set_skill(&mut self, skill: SkillType, level: u32) {
        self.world
            .get::<&mut SkillManager>(self.person)
            .unwrap()
            .set_level(skill, level);
    }

    fn condition_mut(&mut self, f: impl FnOnce(&mut PhysicalCondition)) {
        let mut condition = self.world.get::<&mut PhysicalCondition>(self.person).unwrap();
        f(&mut condition);
    }

    /// One tick for a single task: cycle the airlock, then run the task.
    pub fn step(&mut self, task: &mut Task, time: f64, airlock: Option<Entity>) -> f64 {
        if let Some(airlock) = airlock {
            self.world.get::<&mut Airlock>(airlock).unwrap().add_time(time);
        }
        let mut ctx = self.ctx();
        task.perform(&mut ctx, time)
    }
}
