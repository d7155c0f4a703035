//! Colony generation - spawns a settlement, its buildings, vehicles,
//! equipment and colonists from a JSON scenario.

use hecs::{Entity, EntityBuilder, World};
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use marsbase_logic::condition::PhysicalCondition;
use marsbase_logic::skills::{NaturalAttribute, NaturalAttributes, SkillManager, SkillType};

use super::names::generate_name;
use crate::components::*;
use crate::config::{ConfigError, EngineConfig};
use crate::surface::Coordinates;

/// Maintenance work (millisols) for a full service.
const BUILDING_MAINTENANCE_TIME: f64 = 60.0;
const VEHICLE_MAINTENANCE_TIME: f64 = 80.0;
const SUIT_MAINTENANCE_TIME: f64 = 15.0;
/// Cargo capacity of a ground vehicle per resource (kg).
const VEHICLE_CARGO_CAPACITY: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSpec {
    pub resource: Resource,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub resource: Resource,
    pub capacity: f64,
}

/// Function components a building can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FunctionSpec {
    Airlock { capacity: usize },
    Quarters { beds: usize },
    Gym { machines: usize },
    Infirmary { beds: usize },
    Garage { bays: usize },
    Laboratory { sciences: Vec<ScienceType>, researchers: usize },
    Workshop { processes: Vec<ProcessTemplate>, max_processes: usize },
    Greenhouse { crops: Vec<String>, need_rate: f64 },
    ResourceProcessing { processes: Vec<ResourceProcess> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    #[serde(default = "default_life_support")]
    pub life_support: bool,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

fn default_life_support() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub name: String,
    #[serde(default)]
    pub manifest: Vec<(Resource, f64)>,
    #[serde(default)]
    pub time_since_maintenance: f64,
    /// Park it in the first garage with a free bay.
    #[serde(default)]
    pub garaged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSpec {
    pub skill: SkillType,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AilmentSpec {
    pub name: String,
    pub treatment_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonSpec {
    /// Generated when left out.
    pub name: Option<String>,
    pub skills: Vec<SkillSpec>,
    pub fatigue: f64,
    pub hunger: f64,
    pub stress: f64,
    pub ailment: Option<AilmentSpec>,
}

/// A colony scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonySpec {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population_capacity: usize,
    /// Settlement storage per resource (kg).
    pub storage_capacity: f64,
    pub stock: Vec<StockSpec>,
    pub suits: u32,
    pub containers: Vec<ContainerSpec>,
    pub buildings: Vec<BuildingSpec>,
    pub vehicles: Vec<VehicleSpec>,
    pub people: Vec<PersonSpec>,
    /// Extra colonists with generated names and skills.
    pub random_people: u32,
}

impl Default for ColonySpec {
    fn default() -> Self {
        Self {
            name: "Outpost".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            population_capacity: 8,
            storage_capacity: 5000.0,
            stock: Vec::new(),
            suits: 0,
            containers: Vec::new(),
            buildings: Vec::new(),
            vehicles: Vec::new(),
            people: Vec::new(),
            random_people: 0,
        }
    }
}

impl ColonySpec {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let spec: ColonySpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.storage_capacity.is_finite() || self.storage_capacity < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "storage_capacity must be a non-negative number, got {}",
                self.storage_capacity
            )));
        }
        if let Some(bad) = self.stock.iter().find(|s| !s.amount.is_finite() || s.amount < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "stock of {} must be non-negative",
                bad.resource.name()
            )));
        }
        if let Some(bad) = self.containers.iter().find(|c| c.capacity.is_nan() || c.capacity <= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{} container needs a positive capacity",
                bad.resource.name()
            )));
        }
        for building in &self.buildings {
            for function in &building.functions {
                if let FunctionSpec::Airlock { capacity: 0 } = function {
                    return Err(ConfigError::Invalid(format!(
                        "airlock in {} needs room for at least one person",
                        building.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Entities created for one colony.
#[derive(Debug, Clone, Default)]
pub struct ColonyLayout {
    pub settlement: Option<Entity>,
    pub buildings: Vec<Entity>,
    pub vehicles: Vec<Entity>,
    pub people: Vec<Entity>,
}

/// Generate a whole colony in the ECS world
pub fn generate_colony(
    world: &mut World,
    spec: &ColonySpec,
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> Result<ColonyLayout, ConfigError> {
    spec.validate()?;
    let settlement = spawn_settlement(
        world,
        &spec.name,
        spec.coordinates(),
        spec.population_capacity,
        spec.storage_capacity,
    );
    if let Ok(mut inventory) = world.get::<&mut Inventory>(settlement) {
        for stock in &spec.stock {
            let stored = inventory.store_up_to(stock.resource, stock.amount);
            if stored < stock.amount {
                warn!(
                    "{}: only {:.1} of {:.1} kg {} fits in storage",
                    spec.name,
                    stored,
                    stock.amount,
                    stock.resource.name()
                );
            }
        }
    }
    for _ in 0..spec.suits {
        spawn_suit(world, settlement);
    }
    for container in &spec.containers {
        spawn_container(world, settlement, container.resource, container.capacity);
    }

    let mut layout = ColonyLayout {
        settlement: Some(settlement),
        ..Default::default()
    };

    for building in &spec.buildings {
        let mut functions = EntityBuilder::new();
        for function in &building.functions {
            add_function(&mut functions, function, config);
        }
        let entity = spawn_building(world, settlement, &building.name, building.life_support, functions);
        layout.buildings.push(entity);
    }

    for vehicle in &spec.vehicles {
        let entity = spawn_vehicle(world, settlement, &vehicle.name, config);
        if let Ok(mut malfunctions) = world.get::<&mut MalfunctionManager>(entity) {
            malfunctions.effective_time_since_maintenance = vehicle.time_since_maintenance.max(0.0);
        }
        if !vehicle.manifest.is_empty() {
            let manifest = LoadingManifest {
                resources: vehicle.manifest.clone(),
            };
            if world.insert_one(entity, manifest).is_err() {
                warn!("vehicle {} vanished during generation", vehicle.name);
            }
        }
        if vehicle.garaged {
            park_in_garage(world, entity, &layout.buildings);
        }
        layout.vehicles.push(entity);
    }

    for person in &spec.people {
        let name = match &person.name {
            Some(name) => Name::new(name.clone()),
            None => generate_name(rng),
        };
        let mut skills = SkillManager::default();
        for s in &person.skills {
            skills.set_level(s.skill, s.level);
        }
        let condition = PhysicalCondition::new(person.fatigue, person.hunger, person.stress);
        let entity = spawn_person(world, settlement, name, skills, random_attributes(rng), condition);
        if let Some(ailment) = &person.ailment {
            let problem = HealthProblem::new(ailment.name.clone(), ailment.treatment_time);
            if world.insert_one(entity, problem).is_err() {
                warn!("colonist vanished during generation");
            }
        }
        layout.people.push(entity);
    }

    for _ in 0..spec.random_people {
        let name = generate_name(rng);
        let mut skills = SkillManager::default();
        for skill in SkillType::ALL {
            skills.set_level(skill, rng.gen_range(0..=3));
        }
        let condition = PhysicalCondition::new(
            rng.gen_range(0.0..400.0),
            rng.gen_range(0.0..200.0),
            rng.gen_range(0.0..20.0),
        );
        let entity = spawn_person(world, settlement, name, skills, random_attributes(rng), condition);
        layout.people.push(entity);
    }

    info!(
        "Generated colony {}: {} buildings, {} vehicles, {} colonists",
        spec.name,
        layout.buildings.len(),
        layout.vehicles.len(),
        layout.people.len()
    );
    Ok(layout)
}

fn add_function(builder: &mut EntityBuilder, function: &FunctionSpec, config: &EngineConfig) {
    match function {
        FunctionSpec::Airlock { capacity } => {
            builder.add(configured_airlock(*capacity, config));
        }
        FunctionSpec::Quarters { beds } => {
            builder.add(Quarters { beds: Slots::new(*beds) });
        }
        FunctionSpec::Gym { machines } => {
            builder.add(Gym {
                machines: Slots::new(*machines),
            });
        }
        FunctionSpec::Infirmary { beds } => {
            builder.add(Infirmary { beds: Slots::new(*beds) });
        }
        FunctionSpec::Garage { bays } => {
            builder.add(Garage::new(*bays));
        }
        FunctionSpec::Laboratory { sciences, researchers } => {
            builder.add(Laboratory::new(sciences.clone(), *researchers));
        }
        FunctionSpec::Workshop {
            processes,
            max_processes,
        } => {
            builder.add(Workshop::new(processes.clone(), *max_processes));
        }
        FunctionSpec::Greenhouse { crops, need_rate } => {
            let crops = crops.iter().map(|c| Crop::new(c.clone())).collect();
            builder.add(Greenhouse::new(crops, *need_rate));
        }
        FunctionSpec::ResourceProcessing { processes } => {
            builder.add(ResourceProcessing {
                processes: processes.clone(),
            });
        }
    }
}

fn configured_airlock(capacity: usize, config: &EngineConfig) -> Airlock {
    Airlock::new(capacity)
        .with_cycle_time(config.airlock_cycle_time)
        .with_max_reservations(config.airlock_max_reservations)
}

fn random_attributes(rng: &mut impl Rng) -> NaturalAttributes {
    let mut attributes = NaturalAttributes::default();
    for attribute in [
        NaturalAttribute::AcademicAptitude,
        NaturalAttribute::Agility,
        NaturalAttribute::Endurance,
        NaturalAttribute::ExperienceAptitude,
        NaturalAttribute::Strength,
        NaturalAttribute::Teaching,
    ] {
        attributes.set(attribute, rng.gen_range(30..=70));
    }
    attributes
}

fn park_in_garage(world: &mut World, vehicle: Entity, buildings: &[Entity]) {
    for &building in buildings {
        let parked = match world.get::<&mut Garage>(building) {
            Ok(mut garage) => garage.bays.claim(vehicle, "garage bay").is_ok(),
            Err(_) => false,
        };
        if parked {
            if let Ok(mut v) = world.get::<&mut Vehicle>(vehicle) {
                v.garage = Some(building);
            }
            return;
        }
    }
    warn!("no free garage bay for {:?}", vehicle);
}

/// Spawn a settlement with empty storage sized `storage_capacity` per resource.
pub fn spawn_settlement(
    world: &mut World,
    name: &str,
    coordinates: Coordinates,
    population_capacity: usize,
    storage_capacity: f64,
) -> Entity {
    let mut storage = Inventory::new();
    for resource in Resource::ALL {
        storage = storage.with_capacity(resource, storage_capacity);
    }
    world.spawn((
        Name::new(name),
        Settlement::new(name, coordinates, population_capacity),
        storage,
    ))
}

/// Spawn a building carrying the function components in `functions` and
/// register it with its settlement.
pub fn spawn_building(
    world: &mut World,
    settlement: Entity,
    name: &str,
    life_support: bool,
    mut functions: EntityBuilder,
) -> Entity {
    functions
        .add(Name::new(name))
        .add(Building {
            name: name.to_string(),
            settlement,
            life_support,
        })
        .add(MalfunctionManager::new(
            MalfunctionScope::Building,
            BUILDING_MAINTENANCE_TIME,
        ));
    let building = world.spawn(functions.build());
    if let Ok(mut s) = world.get::<&mut Settlement>(settlement) {
        s.buildings.push(building);
    }
    building
}

/// Spawn an empty suit stored in `holder`'s inventory.
pub fn spawn_suit(world: &mut World, holder: Entity) -> Entity {
    let suit = world.spawn((
        Name::new("EVA suit"),
        EvaSuit,
        EvaSuit::inventory(),
        EvaSuit::malfunctions(SUIT_MAINTENANCE_TIME),
    ));
    if let Ok(mut inventory) = world.get::<&mut Inventory>(holder) {
        inventory.add_unit(suit);
    }
    suit
}

/// Spawn an empty collection container stored in `holder`'s inventory.
pub fn spawn_container(world: &mut World, holder: Entity, resource: Resource, capacity: f64) -> Entity {
    let container = world.spawn((
        Name::new(format!("{} bag", resource.name())),
        Container { resource },
        Container::inventory(resource, capacity),
    ));
    if let Ok(mut inventory) = world.get::<&mut Inventory>(holder) {
        inventory.add_unit(container);
    }
    container
}

/// Spawn a ground vehicle parked at `settlement`, with its own airlock.
pub fn spawn_vehicle(world: &mut World, settlement: Entity, name: &str, config: &EngineConfig) -> Entity {
    let mut cargo = Inventory::new();
    for resource in Resource::ALL {
        cargo = cargo.with_capacity(resource, VEHICLE_CARGO_CAPACITY);
    }
    let vehicle = world.spawn((
        Name::new(name),
        Vehicle {
            name: name.to_string(),
            settlement,
            garage: None,
        },
        cargo,
        MalfunctionManager::new(MalfunctionScope::Vehicle, VEHICLE_MAINTENANCE_TIME),
        configured_airlock(1, config),
    ));
    if let Ok(mut s) = world.get::<&mut Settlement>(settlement) {
        s.vehicles.push(vehicle);
    }
    vehicle
}

/// Spawn a colonist inside `settlement`.
pub fn spawn_person(
    world: &mut World,
    settlement: Entity,
    name: Name,
    skills: SkillManager,
    attributes: NaturalAttributes,
    condition: PhysicalCondition,
) -> Entity {
    let coordinates = world
        .get::<&Settlement>(settlement)
        .map(|s| s.coordinates)
        .unwrap_or_default();
    world.spawn((
        Person,
        name,
        Location::in_settlement(settlement, coordinates),
        condition,
        skills,
        attributes,
        Inventory::new(),
        Activity::default(),
    ))
}
