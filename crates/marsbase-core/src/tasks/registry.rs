//! Explicit task registry: one weight function and one factory per kind,
//! in a fixed order that doubles as the roulette tie-break.

use super::{
    collect_resources, eat_meal, load_vehicle, maintain_vehicle, manufacture_good, medical_assistance, relax,
    repair_emergency, repair_malfunction, research_science, sleep, teach, tend_greenhouse, toggle_resource_process,
    workout, Task, TaskKind,
};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Selection weight of a task kind for the person in `view`.
pub type WeightFn = fn(&TaskView) -> Result<f64, ClaimError>;

/// Build a task for the person in `ctx`.
pub type FactoryFn = fn(&mut TaskContext) -> Result<Task, ClaimError>;

#[derive(Clone, Copy)]
pub struct TaskEntry {
    pub kind: TaskKind,
    pub weight: WeightFn,
    pub create: FactoryFn,
}

impl std::fmt::Debug for TaskEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEntry").field("kind", &self.kind).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    entries: Vec<TaskEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every selectable task of the colony, in catalogue order.
    ///
    /// The airlock transits are sub-tasks only and are not listed; the
    /// emergency repair is listed with weight 0 so it can be looked up.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register(TaskKind::Sleep, sleep::weight, sleep::create)
            .register(TaskKind::EatMeal, eat_meal::weight, eat_meal::create)
            .register(TaskKind::Relax, relax::weight, relax::create)
            .register(TaskKind::Workout, workout::weight, workout::create)
            .register(
                TaskKind::RepairMalfunction,
                repair_malfunction::weight,
                repair_malfunction::create,
            )
            .register(
                TaskKind::RepairEmergencyMalfunction,
                repair_emergency::weight,
                repair_emergency::create,
            )
            .register(
                TaskKind::MaintainGroundVehicleGarage,
                maintain_vehicle::weight,
                maintain_vehicle::create,
            )
            .register(TaskKind::TendGreenhouse, tend_greenhouse::weight, tend_greenhouse::create)
            .register(TaskKind::ManufactureGood, manufacture_good::weight, manufacture_good::create)
            .register(TaskKind::ResearchScience, research_science::weight, research_science::create)
            .register(
                TaskKind::MedicalAssistance,
                medical_assistance::weight,
                medical_assistance::create,
            )
            .register(TaskKind::Teach, teach::weight, teach::create)
            .register(
                TaskKind::ToggleResourceProcess,
                toggle_resource_process::weight,
                toggle_resource_process::create,
            )
            .register(TaskKind::CollectIce, collect_resources::ice_weight, collect_resources::create_ice)
            .register(
                TaskKind::CollectRegolith,
                collect_resources::regolith_weight,
                collect_resources::create_regolith,
            )
            .register(TaskKind::LoadVehicleGarage, load_vehicle::weight, load_vehicle::create);
        registry
    }

    /// Append an entry, or replace the one already registered for `kind`
    /// in place.
    pub fn register(&mut self, kind: TaskKind, weight: WeightFn, create: FactoryFn) -> &mut Self {
        let entry = TaskEntry { kind, weight, create };
        match self.entries.iter_mut().find(|e| e.kind == kind) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn entries(&self) -> &[TaskEntry] {
        &self.entries
    }

    pub fn find(&self, kind: TaskKind) -> Option<&TaskEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
