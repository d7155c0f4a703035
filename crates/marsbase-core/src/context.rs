//! Explicit context handed to every weight function, factory and phase.
//!
//! `TaskView` is the read-only view used to score tasks. `TaskContext`
//! adds mutable world access and the engine RNG for factories and phases.

use hecs::{Component, Entity, World};
use rand::rngs::StdRng;
use rand::Rng;

use marsbase_logic::condition::PhysicalCondition;
use marsbase_logic::skills::{NaturalAttribute, NaturalAttributes, SkillManager, SkillType};

use crate::clock::MarsClock;
use crate::components::{
    Building, Inventory, Location, LocationSituation, MalfunctionManager, Name, Person, Resource,
    Settlement,
};
use crate::config::EngineConfig;
use crate::error::ClaimError;
use crate::surface::{Coordinates, SurfaceFeatures};

#[derive(Clone, Copy)]
pub struct TaskView<'a> {
    pub world: &'a World,
    pub surface: &'a dyn SurfaceFeatures,
    pub config: &'a EngineConfig,
    pub clock: MarsClock,
    pub person: Entity,
}

impl<'a> TaskView<'a> {
    pub fn location(&self) -> Result<Location, ClaimError> {
        Ok(*self.world.get::<&Location>(self.person)?)
    }

    pub fn condition(&self) -> Result<PhysicalCondition, ClaimError> {
        Ok(*self.world.get::<&PhysicalCondition>(self.person)?)
    }

    pub fn performance(&self) -> f64 {
        self.condition().map(|c| c.performance()).unwrap_or(0.0)
    }

    pub fn skill_level(&self, skill: SkillType) -> u32 {
        self.world
            .get::<&SkillManager>(self.person)
            .map(|s| s.level(skill))
            .unwrap_or(0)
    }

    pub fn effective_skill(&self, skill: SkillType) -> i32 {
        let performance = self.performance();
        self.world
            .get::<&SkillManager>(self.person)
            .map(|s| s.effective_level(skill, performance))
            .unwrap_or(0)
    }

    pub fn attribute(&self, attribute: NaturalAttribute) -> u8 {
        self.world
            .get::<&NaturalAttributes>(self.person)
            .map(|a| a.get(attribute))
            .unwrap_or(NaturalAttributes::AVERAGE)
    }

    pub fn is_outside(&self) -> bool {
        self.location().map(|l| l.is_outside()).unwrap_or(false)
    }

    pub fn coordinates(&self) -> Coordinates {
        self.location().map(|l| l.coordinates).unwrap_or_default()
    }

    pub fn solar_irradiance(&self) -> f64 {
        self.surface.solar_irradiance(&self.coordinates(), &self.clock)
    }

    pub fn is_dark(&self) -> bool {
        self.solar_irradiance() <= 0.0
    }

    pub fn in_dark_polar_region(&self) -> bool {
        self.surface.in_dark_polar_region(&self.coordinates(), &self.clock)
    }

    /// Settlement the person is inside right now.
    pub fn settlement(&self) -> Option<Entity> {
        self.location().ok().and_then(|l| l.current_settlement())
    }

    /// Entity whose inventory the person draws on while inside.
    pub fn local_inventory(&self) -> Option<Entity> {
        let location = self.location().ok()?;
        match location.situation {
            LocationSituation::InSettlement => location.settlement,
            LocationSituation::InVehicle => location.vehicle,
            LocationSituation::Outside => None,
        }
    }

    /// Malfunctionable entities local to the person: every building of the
    /// settlement while inside it, the vehicle while inside one, nothing
    /// while outside.
    pub fn local_malfunctionables(&self) -> Vec<Entity> {
        let Ok(location) = self.location() else {
            return Vec::new();
        };
        match location.situation {
            LocationSituation::InSettlement => location
                .settlement
                .map(|s| self.buildings(s))
                .unwrap_or_default()
                .into_iter()
                .filter(|&b| self.world.get::<&MalfunctionManager>(b).is_ok())
                .collect(),
            LocationSituation::InVehicle => location
                .vehicle
                .filter(|&v| self.world.get::<&MalfunctionManager>(v).is_ok())
                .into_iter()
                .collect(),
            LocationSituation::Outside => Vec::new(),
        }
    }

    pub fn buildings(&self, settlement: Entity) -> Vec<Entity> {
        self.world
            .get::<&Settlement>(settlement)
            .map(|s| s.buildings.clone())
            .unwrap_or_default()
    }

    /// Buildings of `settlement` that carry the function component `C`.
    pub fn buildings_with<C: Component>(&self, settlement: Entity) -> Vec<Entity> {
        self.buildings(settlement)
            .into_iter()
            .filter(|&b| self.world.get::<&C>(b).is_ok())
            .collect()
    }

    /// Buildings of `settlement` with function `C` and working life support.
    pub fn habitable_buildings_with<C: Component>(&self, settlement: Entity) -> Vec<Entity> {
        self.buildings_with::<C>(settlement)
            .into_iter()
            .filter(|&b| {
                self.world
                    .get::<&Building>(b)
                    .map(|b| b.life_support)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// People currently inside `settlement`.
    pub fn residents(&self, settlement: Entity) -> Vec<Entity> {
        let mut query = self.world.query::<(&Person, &Location)>();
        query
            .iter()
            .filter(|(_, (_, loc))| loc.current_settlement() == Some(settlement))
            .map(|(e, _)| e)
            .collect()
    }

    pub fn amount_at(&self, holder: Entity, resource: Resource) -> f64 {
        self.world
            .get::<&Inventory>(holder)
            .map(|inv| inv.amount(resource))
            .unwrap_or(0.0)
    }
}

pub struct TaskContext<'a> {
    pub world: &'a mut World,
    pub surface: &'a dyn SurfaceFeatures,
    pub rng: &'a mut StdRng,
    pub config: &'a EngineConfig,
    pub clock: MarsClock,
    pub person: Entity,
}

impl<'a> TaskContext<'a> {
    pub fn view(&self) -> TaskView<'_> {
        TaskView {
            world: &*self.world,
            surface: self.surface,
            config: self.config,
            clock: self.clock,
            person: self.person,
        }
    }

    pub fn performance(&self) -> f64 {
        self.view().performance()
    }

    pub fn effective_skill(&self, skill: SkillType) -> i32 {
        self.view().effective_skill(skill)
    }

    pub fn location(&self) -> Result<Location, ClaimError> {
        self.view().location()
    }

    /// Uniform draw in `[0, 1)`.
    pub fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn add_stress(&mut self, delta: f64) {
        if let Ok(mut condition) = self.world.get::<&mut PhysicalCondition>(self.person) {
            condition.add_stress(delta);
        }
    }

    /// Display name of any entity, for log lines.
    pub fn name_of(&self, entity: Entity) -> String {
        entity_name(self.world, entity)
    }
}

pub fn entity_name(world: &World, entity: Entity) -> String {
    match world.get::<&Name>(entity) {
        Ok(name) => name.to_string(),
        Err(_) => format!("{:?}", entity),
    }
}
