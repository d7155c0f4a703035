//! Settlement and building components.
//!
//! A settlement entity carries `Settlement`, `Name` and the shared
//! `Inventory`. Each building is its own entity with `Building`, a
//! `MalfunctionManager` and any number of function components (`Airlock`,
//! `Garage`, `Laboratory`, `Workshop`, `Greenhouse`, `ResourceProcessing`,
//! `Infirmary`, `Gym`, `Quarters`).

use hecs::Entity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use marsbase_logic::skills::SkillType;

use super::{Inventory, Resource};
use crate::error::ClaimError;
use crate::surface::Coordinates;

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub name: String,
    pub coordinates: Coordinates,
    /// Residents beyond this count make the settlement overcrowded.
    pub population_capacity: usize,
    pub buildings: Vec<Entity>,
    pub vehicles: Vec<Entity>,
}

impl Settlement {
    pub fn new(name: impl Into<String>, coordinates: Coordinates, population_capacity: usize) -> Self {
        Self {
            name: name.into(),
            coordinates,
            population_capacity,
            buildings: Vec::new(),
            vehicles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub name: String,
    pub settlement: Entity,
    /// Pressurized and heated; working in a building without life
    /// support needs an EVA.
    pub life_support: bool,
}

/// A fixed number of places, each held by one entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slots {
    capacity: usize,
    holders: Vec<Entity>,
}

impl Slots {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            holders: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn holders(&self) -> &[Entity] {
        &self.holders
    }

    pub fn holds(&self, who: Entity) -> bool {
        self.holders.contains(&who)
    }

    pub fn is_full(&self) -> bool {
        self.holders.len() >= self.capacity
    }

    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.holders.len())
    }

    /// Take a place. Holding one already counts as success.
    pub fn claim(&mut self, who: Entity, what: &'static str) -> Result<(), ClaimError> {
        if self.holds(who) {
            return Ok(());
        }
        if self.is_full() {
            return Err(ClaimError::NoVacancy(what));
        }
        self.holders.push(who);
        Ok(())
    }

    pub fn release(&mut self, who: Entity) {
        self.holders.retain(|&h| h != who);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Garage {
    pub bays: Slots,
}

impl Garage {
    pub fn new(bays: usize) -> Self {
        Self { bays: Slots::new(bays) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScienceType {
    Areology,
    Botany,
    Chemistry,
    Medicine,
    Physics,
}

impl ScienceType {
    pub fn skill(self) -> SkillType {
        match self {
            ScienceType::Areology => SkillType::Areology,
            ScienceType::Botany => SkillType::Botany,
            ScienceType::Chemistry => SkillType::Chemistry,
            ScienceType::Medicine => SkillType::Medicine,
            ScienceType::Physics => SkillType::Physics,
        }
    }

    pub fn name(self) -> &'static str {
        self.skill().name()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Laboratory {
    pub sciences: Vec<ScienceType>,
    pub researchers: Slots,
    /// Research work accumulated per science.
    pub output: BTreeMap<ScienceType, f64>,
}

impl Laboratory {
    pub fn new(sciences: Vec<ScienceType>, capacity: usize) -> Self {
        Self {
            sciences,
            researchers: Slots::new(capacity),
            output: BTreeMap::new(),
        }
    }

    pub fn supports(&self, science: ScienceType) -> bool {
        self.sciences.contains(&science)
    }

    pub fn add_research(&mut self, science: ScienceType, work: f64) {
        *self.output.entry(science).or_insert(0.0) += work.max(0.0);
    }

    pub fn research(&self, science: ScienceType) -> f64 {
        self.output.get(&science).copied().unwrap_or(0.0)
    }
}

/// A manufacturing recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTemplate {
    pub name: String,
    pub inputs: Vec<(Resource, f64)>,
    pub outputs: Vec<(Resource, f64)>,
    /// Hands-on work required.
    pub work_time: f64,
    /// Unattended time after the work is done.
    pub process_time: f64,
    /// Net value of running the recipe once.
    pub value: f64,
}

impl ProcessTemplate {
    pub fn inputs_available(&self, inventory: &Inventory) -> bool {
        self.inputs
            .iter()
            .all(|&(resource, amount)| inventory.amount(resource) >= amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManufactureProcess {
    pub template: ProcessTemplate,
    pub work_remaining: f64,
    pub process_remaining: f64,
}

impl ManufactureProcess {
    pub fn start(template: &ProcessTemplate) -> Self {
        Self {
            template: template.clone(),
            work_remaining: template.work_time,
            process_remaining: template.process_time,
        }
    }

    pub fn needs_work(&self) -> bool {
        self.work_remaining > 0.0
    }

    pub fn is_finished(&self) -> bool {
        self.work_remaining <= 0.0 && self.process_remaining <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workshop {
    pub templates: Vec<ProcessTemplate>,
    pub processes: Vec<ManufactureProcess>,
    pub max_processes: usize,
}

impl Workshop {
    pub fn new(templates: Vec<ProcessTemplate>, max_processes: usize) -> Self {
        Self {
            templates,
            processes: Vec::new(),
            max_processes,
        }
    }

    pub fn work_waiting(&self) -> bool {
        self.processes.iter().any(|p| p.needs_work())
    }

    pub fn has_free_line(&self) -> bool {
        self.processes.len() < self.max_processes
    }

    /// Most valuable recipe whose inputs are all in `inventory`.
    pub fn best_startable(&self, inventory: &Inventory) -> Option<&ProcessTemplate> {
        if !self.has_free_line() {
            return None;
        }
        self.templates
            .iter()
            .filter(|t| t.value > 0.0 && t.inputs_available(inventory))
            .max_by(|a, b| a.value.total_cmp(&b.value))
    }

    /// Give work to running processes in order. Returns the unused work.
    pub fn add_work(&mut self, work: f64) -> f64 {
        let mut left = work.max(0.0);
        for process in self.processes.iter_mut().filter(|p| p.needs_work()) {
            let used = left.min(process.work_remaining);
            process.work_remaining -= used;
            left -= used;
            if left <= 0.0 {
                break;
            }
        }
        left
    }

    /// Advance unattended timers. Finished processes are removed and returned.
    pub fn time_passing(&mut self, time: f64) -> Vec<ManufactureProcess> {
        for process in self.processes.iter_mut().filter(|p| !p.needs_work()) {
            process.process_remaining = (process.process_remaining - time).max(0.0);
        }
        let (finished, running): (Vec<_>, Vec<_>) =
            self.processes.drain(..).partition(|p| p.is_finished());
        self.processes = running;
        finished
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub name: String,
    /// Tending work the crop is waiting for.
    pub work_needed: f64,
    /// Tending work received so far.
    pub growth: f64,
}

impl Crop {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            work_needed: 0.0,
            growth: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Greenhouse {
    pub crops: Vec<Crop>,
    /// Tending work each crop asks for per millisol.
    pub need_rate: f64,
}

impl Greenhouse {
    pub fn new(crops: Vec<Crop>, need_rate: f64) -> Self {
        Self { crops, need_rate }
    }

    pub fn outstanding_work(&self) -> f64 {
        self.crops.iter().map(|c| c.work_needed).sum()
    }

    pub fn time_passing(&mut self, time: f64) {
        for crop in &mut self.crops {
            crop.work_needed += time * self.need_rate;
        }
    }

    /// Spend work on the crops in most need first. Returns the unused work.
    pub fn add_work(&mut self, work: f64) -> f64 {
        let mut left = work.max(0.0);
        while left > 0.0 {
            let neediest = self
                .crops
                .iter_mut()
                .filter(|c| c.work_needed > 0.0)
                .max_by(|a, b| a.work_needed.total_cmp(&b.work_needed));
            let Some(crop) = neediest else {
                break;
            };
            let used = left.min(crop.work_needed);
            crop.work_needed -= used;
            crop.growth += used;
            left -= used;
        }
        left
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProcess {
    pub name: String,
    pub running: bool,
    /// Value gained by flipping the process, supplied by the goods economy.
    pub value_diff: f64,
    /// Work needed to flip the switch.
    pub toggle_work: f64,
    #[serde(default)]
    pub toggle_progress: f64,
}

impl ResourceProcess {
    /// Add toggle work. Returns true when the process flipped.
    pub fn add_toggle_work(&mut self, work: f64) -> bool {
        self.toggle_progress += work.max(0.0);
        if self.toggle_progress >= self.toggle_work {
            self.toggle_progress = 0.0;
            self.running = !self.running;
            self.value_diff = -self.value_diff;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceProcessing {
    pub processes: Vec<ResourceProcess>,
}

impl ResourceProcessing {
    /// Index and value of the process most worth toggling.
    pub fn best_toggle(&self) -> Option<(usize, f64)> {
        self.processes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.value_diff > 0.0)
            .map(|(i, p)| (i, p.value_diff))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Infirmary {
    pub beds: Slots,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gym {
    pub machines: Slots,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quarters {
    pub beds: Slots,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    #[test]
    fn test_slots_claim_and_release() {
        let mut world = World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let mut slots = Slots::new(1);
        assert!(slots.claim(a, "bed").is_ok());
        assert!(slots.claim(a, "bed").is_ok());
        assert!(matches!(slots.claim(b, "bed"), Err(ClaimError::NoVacancy("bed"))));
        slots.release(a);
        assert!(slots.claim(b, "bed").is_ok());
        assert_eq!(slots.available(), 0);
    }

    #[test]
    fn test_greenhouse_tends_neediest_first() {
        let mut greenhouse = Greenhouse::new(vec![Crop::new("Potato"), Crop::new("Soybean")], 0.0);
        greenhouse.crops[0].work_needed = 5.0;
        greenhouse.crops[1].work_needed = 10.0;
        assert_eq!(greenhouse.add_work(7.0), 0.0);
        assert_eq!(greenhouse.crops[1].work_needed, 3.0);
        assert_eq!(greenhouse.crops[0].work_needed, 5.0);
        assert_eq!(greenhouse.add_work(20.0), 12.0);
        assert_eq!(greenhouse.outstanding_work(), 0.0);
    }

    fn brick_press() -> ProcessTemplate {
        ProcessTemplate {
            name: "Bricks".into(),
            inputs: vec![(Resource::Regolith, 10.0)],
            outputs: vec![(Resource::Bricks, 8.0)],
            work_time: 5.0,
            process_time: 20.0,
            value: 1.5,
        }
    }

    #[test]
    fn test_workshop_process_lifecycle() {
        let mut workshop = Workshop::new(vec![brick_press()], 1);
        let stocked = Inventory::new().with_amount(Resource::Regolith, 10.0);
        assert!(workshop.best_startable(&Inventory::new()).is_none());
        let template = workshop.best_startable(&stocked).cloned().unwrap();
        workshop.processes.push(ManufactureProcess::start(&template));
        assert!(workshop.best_startable(&stocked).is_none(), "only one line");

        // process timer waits for the hands-on work
        assert!(workshop.time_passing(50.0).is_empty());
        assert_eq!(workshop.add_work(8.0), 3.0);
        assert!(workshop.time_passing(15.0).is_empty());
        let done = workshop.time_passing(5.0);
        assert_eq!(done.len(), 1);
        assert!(workshop.processes.is_empty());
    }

    #[test]
    fn test_toggle_flips_value() {
        let mut process = ResourceProcess {
            name: "Water Electrolysis".into(),
            running: false,
            value_diff: 0.02,
            toggle_work: 10.0,
            toggle_progress: 0.0,
        };
        assert!(!process.add_toggle_work(6.0));
        assert!(process.add_toggle_work(6.0));
        assert!(process.running);
        assert!(process.value_diff < 0.0);
        let processing = ResourceProcessing {
            processes: vec![process],
        };
        assert_eq!(processing.best_toggle(), None);
    }
}
