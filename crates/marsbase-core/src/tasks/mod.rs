//! Task framework: what a colonist is doing and how it advances.
//!
//! A [`Task`] pairs shared bookkeeping ([`TaskState`]) with a
//! [`TaskBehavior`] holding the task's own phase machine. Phases are a
//! closed enum per task. Each call to [`TaskBehavior::perform_phase`]
//! consumes up to the time it is given and returns what it did not use.
//!
//! Delegation works through a per-agent stack owned by the
//! [`TaskManager`]. A phase that needs help calls
//! [`TaskState::add_sub_task`]; the manager pushes the pending task after
//! the phase returns and hands it the leftover time. When a sub-task
//! finishes it is popped and the parent picks up where it left off.

use hecs::Entity;
use log::{debug, info};

use marsbase_logic::accident::{accident_chance, accident_triggered};
use marsbase_logic::constants::accident::ACCIDENT_STRESS;
use marsbase_logic::skills::{NaturalAttribute, NaturalAttributes, SkillManager, SkillType};
use marsbase_logic::work::{experience_gain, stress_delta, teaching_modifier};

use crate::components::{Activity, MalfunctionManager};
use crate::context::TaskContext;

mod manager;
mod registry;

pub mod eva;
mod exit_airlock;
mod enter_airlock;

pub mod collect_resources;
pub mod eat_meal;
pub mod load_vehicle;
pub mod maintain_vehicle;
pub mod manufacture_good;
pub mod medical_assistance;
pub mod relax;
pub mod repair_emergency;
pub mod repair_malfunction;
pub mod research_science;
pub mod sleep;
pub mod teach;
pub mod tend_greenhouse;
pub mod toggle_resource_process;
pub mod workout;

pub use enter_airlock::EnterAirlock;
pub use exit_airlock::ExitAirlock;
pub use manager::TaskManager;
pub use registry::{FactoryFn, TaskEntry, TaskRegistry, WeightFn};

/// Upper bound on phase steps within one call, guards against phases
/// that keep flipping without consuming time.
const MAX_PHASE_STEPS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Sleep,
    EatMeal,
    Relax,
    Workout,
    RepairMalfunction,
    RepairEmergencyMalfunction,
    MaintainGroundVehicleGarage,
    TendGreenhouse,
    ManufactureGood,
    ResearchScience,
    MedicalAssistance,
    Teach,
    ToggleResourceProcess,
    CollectIce,
    CollectRegolith,
    LoadVehicleGarage,
    ExitAirlock,
    EnterAirlock,
}

impl TaskKind {
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Sleep => "Sleep",
            TaskKind::EatMeal => "Eat Meal",
            TaskKind::Relax => "Relax",
            TaskKind::Workout => "Workout",
            TaskKind::RepairMalfunction => "Repair Malfunction",
            TaskKind::RepairEmergencyMalfunction => "Repair Emergency Malfunction",
            TaskKind::MaintainGroundVehicleGarage => "Maintain Vehicle",
            TaskKind::TendGreenhouse => "Tend Greenhouse",
            TaskKind::ManufactureGood => "Manufacture Good",
            TaskKind::ResearchScience => "Research Science",
            TaskKind::MedicalAssistance => "Medical Assistance",
            TaskKind::Teach => "Teach",
            TaskKind::ToggleResourceProcess => "Toggle Resource Process",
            TaskKind::CollectIce => "Collect Ice",
            TaskKind::CollectRegolith => "Collect Regolith",
            TaskKind::LoadVehicleGarage => "Load Vehicle",
            TaskKind::ExitAirlock => "Exit Airlock",
            TaskKind::EnterAirlock => "Enter Airlock",
        }
    }

    /// Moving through an airlock; emergencies wait until it is over.
    pub fn is_airlock_transit(self) -> bool {
        matches!(self, TaskKind::ExitAirlock | TaskKind::EnterAirlock)
    }

    /// Work that trains a skill and so can be taught.
    pub fn is_teachable(self) -> bool {
        matches!(
            self,
            TaskKind::RepairMalfunction
                | TaskKind::MaintainGroundVehicleGarage
                | TaskKind::TendGreenhouse
                | TaskKind::ManufactureGood
                | TaskKind::ResearchScience
                | TaskKind::MedicalAssistance
                | TaskKind::ToggleResourceProcess
                | TaskKind::CollectIce
                | TaskKind::CollectRegolith
        )
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bookkeeping every task shares.
pub struct TaskState {
    pub description: String,
    done: bool,
    pub time_completed: f64,
    /// The task ends once `time_completed` reaches this.
    pub duration: Option<f64>,
    /// Elapsed time is scaled by the agent's efficiency before use.
    pub effort_driven: bool,
    /// Stress per millisol; negative values relieve stress.
    pub stress_modifier: f64,
    /// Skills trained by the task. The first one also tempers stress.
    pub skills: Vec<SkillType>,
    pub experience_attribute: NaturalAttribute,
    sub_task: Option<Box<Task>>,
}

impl TaskState {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            done: false,
            time_completed: 0.0,
            duration: None,
            effort_driven: false,
            stress_modifier: 0.0,
            skills: Vec::new(),
            experience_attribute: NaturalAttribute::ExperienceAptitude,
            sub_task: None,
        }
    }

    pub fn effort_driven(mut self) -> Self {
        self.effort_driven = true;
        self
    }

    pub fn with_stress(mut self, stress_modifier: f64) -> Self {
        self.stress_modifier = stress_modifier;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration.max(0.0));
        self
    }

    pub fn with_skills(mut self, skills: &[SkillType]) -> Self {
        self.skills = skills.to_vec();
        self
    }

    pub fn with_experience_attribute(mut self, attribute: NaturalAttribute) -> Self {
        self.experience_attribute = attribute;
        self
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Idempotent; a finished task never comes back.
    pub fn end_task(&mut self) {
        self.done = true;
    }

    /// Queue a sub-task at the bottom of the pending chain.
    pub fn add_sub_task(&mut self, task: Task) {
        match self.sub_task.as_mut() {
            Some(pending) => pending.state.add_sub_task(task),
            None => self.sub_task = Some(Box::new(task)),
        }
    }

    pub fn has_sub_task(&self) -> bool {
        self.sub_task.is_some()
    }

    pub(crate) fn take_sub_task(&mut self) -> Option<Task> {
        self.sub_task.take().map(|t| *t)
    }
}

/// Phase machine of one kind of task.
pub trait TaskBehavior: Send {
    fn phase_name(&self) -> &'static str;

    /// Run the current phase for up to `time` millisols and return the
    /// time not used. Ending the task or changing phase is done here.
    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64;

    /// Release anything held: slots, reservations, carried units.
    fn clear_down(&mut self, _ctx: &mut TaskContext) {}
}

pub struct Task {
    kind: TaskKind,
    pub state: TaskState,
    behavior: Box<dyn TaskBehavior>,
    cleared_down: bool,
}

impl Task {
    pub fn new(kind: TaskKind, state: TaskState, behavior: impl TaskBehavior + 'static) -> Self {
        Self {
            kind,
            state,
            behavior: Box::new(behavior),
            cleared_down: false,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn end_task(&mut self) {
        self.state.end_task();
    }

    pub fn phase_name(&self) -> &'static str {
        self.behavior.phase_name()
    }

    pub fn description(&self) -> &str {
        &self.state.description
    }

    /// Run this task's own phases for up to `time` millisols.
    ///
    /// Stops early when the task ends, when a phase queues a sub-task, or
    /// when a phase hands back all of its time without moving on (the
    /// agent idles for the rest of the tick). Returns the unused time.
    pub fn perform(&mut self, ctx: &mut TaskContext, time: f64) -> f64 {
        if self.state.is_done() || time <= 0.0 {
            return time.max(0.0);
        }
        if self.state.effort_driven && ctx.performance() <= 0.0 {
            info!("{} too incapacitated for {}", ctx.name_of(ctx.person), self.kind);
            self.state.end_task();
            return time;
        }

        let mut remaining = time;
        for _ in 0..MAX_PHASE_STEPS {
            if remaining <= 0.0 || self.state.is_done() || self.state.has_sub_task() {
                break;
            }
            let mut step = remaining;
            if let Some(duration) = self.state.duration {
                let left = duration - self.state.time_completed;
                if left <= 0.0 {
                    self.state.end_task();
                    break;
                }
                step = step.min(left);
            }

            let phase = self.behavior.phase_name();
            let returned = self.behavior.perform_phase(ctx, &mut self.state, step);
            let returned = if returned.is_finite() {
                returned.clamp(0.0, step)
            } else {
                0.0
            };
            let used = step - returned;
            self.state.time_completed += used;
            remaining -= used;

            if let Some(duration) = self.state.duration {
                if self.state.time_completed >= duration {
                    self.state.end_task();
                }
            }
            let next = self.behavior.phase_name();
            if next != phase {
                debug!("{}: {} -> {}", self.kind, phase, next);
            } else if used <= 0.0 {
                break;
            }
        }

        let consumed = time - remaining;
        if consumed > 0.0 {
            self.apply_stress(ctx, consumed);
            add_experience(ctx, &self.state, consumed);
        }
        remaining
    }

    fn apply_stress(&self, ctx: &mut TaskContext, time: f64) {
        if self.state.stress_modifier == 0.0 {
            return;
        }
        let skill = self
            .state
            .skills
            .first()
            .map(|&s| ctx.effective_skill(s))
            .unwrap_or(0);
        ctx.add_stress(stress_delta(self.state.stress_modifier, skill, time));
    }

    /// Release held resources. Runs at most once.
    pub fn clear_down(&mut self, ctx: &mut TaskContext) {
        if let Some(mut pending) = self.state.take_sub_task() {
            pending.clear_down(ctx);
        }
        if !self.cleared_down {
            self.cleared_down = true;
            self.behavior.clear_down(ctx);
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind)
            .field("phase", &self.phase_name())
            .field("done", &self.is_done())
            .field("time_completed", &self.state.time_completed)
            .finish()
    }
}

/// Credit experience for `time` millisols of work. The first skill gets
/// the full gain, any others half.
pub fn add_experience(ctx: &mut TaskContext, state: &TaskState, time: f64) {
    if state.skills.is_empty() {
        return;
    }
    let view = ctx.view();
    let aptitude = view.attribute(state.experience_attribute);
    let teacher = view
        .world
        .get::<&Activity>(ctx.person)
        .ok()
        .and_then(|a| a.teacher)
        .map(|t| {
            let skill = view
                .world
                .get::<&SkillManager>(t)
                .map(|s| s.level(SkillType::Teaching))
                .unwrap_or(0);
            let aptitude = view
                .world
                .get::<&NaturalAttributes>(t)
                .map(|a| a.get(NaturalAttribute::AcademicAptitude))
                .unwrap_or(NaturalAttributes::AVERAGE);
            (skill, aptitude)
        });
    let gain = experience_gain(time, aptitude, teaching_modifier(teacher));
    if let Ok(mut skills) = ctx.world.get::<&mut SkillManager>(ctx.person) {
        for (i, &skill) in state.skills.iter().enumerate() {
            let points = if i == 0 { gain } else { gain / 2.0 };
            skills.add_experience(skill, points);
        }
    }
}

/// Real time left over when `work` was derived from `time` and only part
/// of it was used.
pub(crate) fn unused_time(time: f64, work: f64, leftover_work: f64) -> f64 {
    if work <= 0.0 {
        return time;
    }
    (time * leftover_work / work).clamp(0.0, time)
}

/// Skill-scaled accident roll against a building or vehicle.
///
/// Worn equipment is riskier. A hit strikes a malfunction on `entity` and
/// shakes the agent up. Returns true when an accident happened.
pub fn check_for_accident(ctx: &mut TaskContext, entity: Entity, skill: SkillType, time: f64) -> bool {
    let effective = ctx.effective_skill(skill);
    let wear = match ctx.world.get::<&MalfunctionManager>(entity) {
        Ok(m) => m.accident_modifier(),
        Err(_) => return false,
    };
    let chance = accident_chance(ctx.config.base_accident_chance, effective) * wear;
    let roll = ctx.roll();
    if !accident_triggered(chance, time, roll) {
        return false;
    }
    let struck = match ctx.world.get::<&mut MalfunctionManager>(entity) {
        Ok(mut m) => m.accident(&mut *ctx.rng).map(|m| m.name.clone()),
        Err(_) => None,
    };
    ctx.add_stress(ACCIDENT_STRESS);
    info!(
        "Accident: {} caused {} at {}",
        ctx.name_of(ctx.person),
        struck.as_deref().unwrap_or("damage"),
        ctx.name_of(entity)
    );
    true
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    struct Countdown {
        left: u32,
    }

    impl TaskBehavior for Countdown {
        fn phase_name(&self) -> &'static str {
            "COUNTING"
        }

        fn perform_phase(&mut self, _ctx: &mut TaskContext, state: &mut TaskState, _time: f64) -> f64 {
            self.left = self.left.saturating_sub(1);
            if self.left == 0 {
                state.end_task();
            }
            0.0
        }
    }

    /// Hands all time back and never advances.
    struct Stuck;

    impl TaskBehavior for Stuck {
        fn phase_name(&self) -> &'static str {
            "WAITING"
        }

        fn perform_phase(&mut self, _ctx: &mut TaskContext, _state: &mut TaskState, time: f64) -> f64 {
            time
        }
    }

    #[test]
    fn test_end_task_is_idempotent() {
        let mut state = TaskState::new("x");
        state.end_task();
        state.end_task();
        assert!(state.is_done());
    }

    #[test]
    fn test_sub_task_chain_appends_at_bottom() {
        let mut state = TaskState::new("outer");
        state.add_sub_task(Task::new(TaskKind::Relax, TaskState::new("a"), Stuck));
        state.add_sub_task(Task::new(TaskKind::Relax, TaskState::new("b"), Stuck));
        let first = state.take_sub_task().unwrap();
        assert_eq!(first.description(), "a");
        assert!(first.state.has_sub_task());
        assert!(!state.has_sub_task());
    }

    #[test]
    fn test_duration_returns_surplus() {
        let mut fx = Fixture::new();
        let mut task = Task::new(
            TaskKind::Relax,
            TaskState::new("timed").with_duration(15.0),
            Countdown { left: 100 },
        );
        let mut ctx = fx.ctx();
        assert_eq!(task.perform(&mut ctx, 10.0), 0.0);
        assert!(!task.is_done());
        assert_eq!(task.perform(&mut ctx, 10.0), 5.0);
        assert!(task.is_done());
        assert_eq!(task.state.time_completed, 15.0);
    }

    #[test]
    fn test_done_task_is_not_advanced() {
        let mut fx = Fixture::new();
        let mut task = Task::new(TaskKind::Relax, TaskState::new("once"), Countdown { left: 1 });
        let mut ctx = fx.ctx();
        task.perform(&mut ctx, 5.0);
        assert!(task.is_done());
        let before = task.state.time_completed;
        assert_eq!(task.perform(&mut ctx, 5.0), 5.0);
        assert_eq!(task.state.time_completed, before);
    }

    #[test]
    fn test_idle_phase_returns_time() {
        let mut fx = Fixture::new();
        let mut task = Task::new(TaskKind::Relax, TaskState::new("stuck"), Stuck);
        let mut ctx = fx.ctx();
        assert_eq!(task.perform(&mut ctx, 7.0), 7.0);
        assert!(!task.is_done());
    }

    #[test]
    fn test_incapacitated_agent_drops_effort_task() {
        let mut fx = Fixture::new();
        fx.set_performance(0.0);
        let mut task = Task::new(
            TaskKind::RepairMalfunction,
            TaskState::new("repair").effort_driven(),
            Stuck,
        );
        let mut ctx = fx.ctx();
        assert_eq!(task.perform(&mut ctx, 3.0), 3.0);
        assert!(task.is_done());
    }

    #[test]
    fn test_stress_follows_modifier() {
        let mut fx = Fixture::new();
        fx.set_stress(50.0);
        let mut task = Task::new(
            TaskKind::Relax,
            TaskState::new("calm").with_stress(-0.5),
            Countdown { left: 100 },
        );
        task.perform(&mut fx.ctx(), 10.0);
        assert!((fx.stress() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_experience_credited_to_skills() {
        let mut fx = Fixture::new();
        let mut task = Task::new(
            TaskKind::TendGreenhouse,
            TaskState::new("tend").with_skills(&[SkillType::Botany, SkillType::Chemistry]),
            Countdown { left: 100 },
        );
        task.perform(&mut fx.ctx(), 10.0);
        let skills = fx.world.get::<&SkillManager>(fx.person).unwrap();
        assert!((skills.experience(SkillType::Botany) - 0.1).abs() < 1e-9);
        assert!((skills.experience(SkillType::Chemistry) - 0.05).abs() < 1e-9);
    }
}
