//! Per-agent task manager: picks the next task and drives the stack.
//!
//! The stack holds the top-level task at index 0 and the running
//! sub-task on top. Each tick the manager
//!
//! 1. pushes an emergency repair if a local emergency appeared,
//! 2. selects a new task by roulette wheel when the stack is empty,
//! 3. scales the quantum by efficiency for effort-driven work,
//! 4. runs the top of the stack, pushing queued sub-tasks and popping
//!    finished ones until the time is used up or the agent idles,
//! 5. publishes the agent's [`Activity`].

use log::{debug, info, warn};

use marsbase_logic::selection::{sanitize_weight, select_index, total_weight};
use marsbase_logic::work::effort_time;

use super::{repair_emergency, relax, EnterAirlock, Task, TaskEntry, TaskKind, TaskRegistry};
use crate::components::{Activity, MalfunctionManager};
use crate::context::{TaskContext, TaskView};

/// Guards the stack loop against tasks that keep spawning sub-tasks.
const MAX_STACK_STEPS: usize = 32;

/// Weights computed for one integer millisol.
#[derive(Debug, Clone)]
struct ProbabilityCache {
    stamp: u64,
    weights: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct TaskManager {
    stack: Vec<Task>,
    last_task: Option<TaskKind>,
    cache: Option<ProbabilityCache>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance this agent by `time` millisols. Returns the time the stack
    /// did not use.
    pub fn perform_task(&mut self, ctx: &mut TaskContext, registry: &TaskRegistry, time: f64, efficiency: f64) -> f64 {
        if !(time > 0.0) {
            return 0.0;
        }
        self.check_for_emergency(ctx, registry);
        if self.stack.is_empty() {
            self.start_new_task(ctx, registry);
        }
        let effort_driven = match self.stack.first() {
            Some(task) => task.state.effort_driven,
            None => {
                self.publish_activity(ctx);
                return time;
            }
        };
        let time = if effort_driven {
            effort_time(time, efficiency, ctx.config.min_task_efficiency)
        } else {
            time
        };
        let remaining = self.run_stack(ctx, time);
        self.publish_activity(ctx);
        remaining
    }

    fn run_stack(&mut self, ctx: &mut TaskContext, time: f64) -> f64 {
        let mut remaining = time;
        for _ in 0..MAX_STACK_STEPS {
            let Some(top) = self.stack.last_mut() else {
                break;
            };
            if top.is_done() {
                self.pop_finished(ctx);
                continue;
            }
            if remaining <= 0.0 {
                break;
            }
            remaining = top.perform(ctx, remaining);
            if let Some(sub_task) = top.state.take_sub_task() {
                debug!("{} delegates to {}", top.kind(), sub_task.kind());
                self.stack.push(sub_task);
                continue;
            }
            if !top.is_done() {
                break;
            }
        }
        remaining
    }

    fn pop_finished(&mut self, ctx: &mut TaskContext) {
        if let Some(mut finished) = self.stack.pop() {
            finished.clear_down(ctx);
            info!("{} finished {}", ctx.name_of(ctx.person), finished.description());
            self.last_task = Some(finished.kind());
            self.cache = None;
        }
    }

    /// Push an emergency repair on top of whatever is running when a
    /// malfunctionable near the agent has an emergency.
    fn check_for_emergency(&mut self, ctx: &mut TaskContext, registry: &TaskRegistry) {
        if self.has_task(TaskKind::RepairEmergencyMalfunction) {
            return;
        }
        if self.stack.last().map(|t| t.kind().is_airlock_transit()).unwrap_or(false) {
            return;
        }
        let view = ctx.view();
        let emergency = view.local_malfunctionables().into_iter().any(|entity| {
            view.world
                .get::<&MalfunctionManager>(entity)
                .map(|m| m.has_emergency_malfunction())
                .unwrap_or(false)
        });
        if !emergency {
            return;
        }
        let create = registry
            .find(TaskKind::RepairEmergencyMalfunction)
            .map(|e| e.create)
            .unwrap_or(repair_emergency::create);
        match create(ctx) {
            Ok(task) => {
                info!("{} drops everything for {}", ctx.name_of(ctx.person), task.description());
                self.stack.push(task);
                self.cache = None;
            }
            Err(e) => warn!("{} could not respond to emergency: {}", ctx.name_of(ctx.person), e),
        }
    }

    fn start_new_task(&mut self, ctx: &mut TaskContext, registry: &TaskRegistry) {
        let total = self.get_total_task_probability(&ctx.view(), registry);
        let task = if total > 0.0 {
            self.get_new_task(ctx, registry, total)
        } else {
            fallback_task(ctx)
        };
        if let Some(task) = task {
            info!("{} starts {}", ctx.name_of(ctx.person), task.description());
            self.stack.push(task);
            self.cache = None;
        }
    }

    /// Sum of every registered weight for the agent in `view`.
    ///
    /// Weights are sanitised and capped; a failing weight function counts
    /// as 0. Results are reused within the same millisol.
    pub fn get_total_task_probability(&mut self, view: &TaskView, registry: &TaskRegistry) -> f64 {
        let stamp = view.clock.stamp();
        let fresh = view.config.cache_probabilities
            && self
                .cache
                .as_ref()
                .map(|c| c.stamp == stamp && c.weights.len() == registry.len())
                .unwrap_or(false);
        if !fresh {
            let cap = view.config.max_task_probability;
            let weights = registry.entries().iter().map(|e| weigh(e, view, cap)).collect();
            self.cache = Some(ProbabilityCache { stamp, weights });
        }
        self.cache.as_ref().map(|c| total_weight(&c.weights)).unwrap_or(0.0)
    }

    /// Roulette-wheel pick over the cached weights, then build the task.
    pub fn get_new_task(&mut self, ctx: &mut TaskContext, registry: &TaskRegistry, total: f64) -> Option<Task> {
        let r = ctx.roll() * total;
        let index = {
            let cache = self.cache.as_ref()?;
            select_index(&cache.weights, r)?
        };
        let entry = registry.entries().get(index)?;
        match (entry.create)(ctx) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!("{} could not start {}: {}", ctx.name_of(ctx.person), entry.kind, e);
                None
            }
        }
    }

    /// Start `task`. As a sub-task it goes on top of the stack, unless the
    /// top already is the same kind; otherwise it replaces everything.
    pub fn add_task(&mut self, ctx: &mut TaskContext, mut task: Task, as_sub_task: bool) {
        if as_sub_task {
            if self.stack.last().map(|t| t.kind()) == Some(task.kind()) {
                debug!("already running {}, ignoring", task.kind());
                task.clear_down(ctx);
                return;
            }
        } else {
            self.clear_all_tasks(ctx);
        }
        self.stack.push(task);
        self.cache = None;
    }

    /// End the whole stack, remembering the top-level task as the last one.
    pub fn end_current_task(&mut self, ctx: &mut TaskContext) {
        if let Some(kind) = self.stack.first().map(|t| t.kind()) {
            self.last_task = Some(kind);
        }
        self.clear_all_tasks(ctx);
    }

    /// End the running sub-task; the parent resumes next tick.
    pub fn end_sub_task(&mut self, ctx: &mut TaskContext) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(top) = self.stack.last_mut() {
            top.end_task();
        }
        self.pop_finished(ctx);
    }

    pub fn clear_all_tasks(&mut self, ctx: &mut TaskContext) {
        while let Some(mut task) = self.stack.pop() {
            task.end_task();
            task.clear_down(ctx);
        }
        self.cache = None;
    }

    pub fn has_task(&self, kind: TaskKind) -> bool {
        self.stack.iter().any(|t| t.kind() == kind)
    }

    pub fn has_active_task(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The top-level task.
    pub fn current_task(&self) -> Option<&Task> {
        self.stack.first()
    }

    /// The task actually running: the deepest sub-task.
    pub fn active_task(&self) -> Option<&Task> {
        self.stack.last()
    }

    pub fn last_task(&self) -> Option<TaskKind> {
        self.last_task
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn description(&self) -> &str {
        self.active_task().map(|t| t.description()).unwrap_or("")
    }

    pub fn phase(&self) -> &'static str {
        self.active_task().map(|t| t.phase_name()).unwrap_or("")
    }

    fn publish_activity(&self, ctx: &mut TaskContext) {
        let kind = self.current_task().map(|t| t.kind());
        let active = self.active_task();
        if let Ok(mut activity) = ctx.world.get::<&mut Activity>(ctx.person) {
            if activity.kind != kind {
                activity.teacher = None;
            }
            activity.kind = kind;
            activity.active = active.map(|t| t.kind());
            activity.phase = active.map(|t| t.phase_name()).unwrap_or("");
            activity.description = active.map(|t| t.description().to_string()).unwrap_or_default();
        }
    }
}

fn weigh(entry: &TaskEntry, view: &TaskView, cap: f64) -> f64 {
    match (entry.weight)(view) {
        Ok(raw) => {
            let (weight, issue) = sanitize_weight(raw, cap);
            if let Some(issue) = issue {
                warn!("{} weight {} rejected: {:?}", entry.kind, raw, issue);
            }
            weight
        }
        Err(e) => {
            warn!("{} weight failed: {}", entry.kind, e);
            0.0
        }
    }
}

/// Nothing scored: head back in from outside, otherwise take a break.
fn fallback_task(ctx: &mut TaskContext) -> Option<Task> {
    let created = if ctx.view().is_outside() {
        EnterAirlock::fallback(ctx)
    } else {
        relax::create(ctx)
    };
    match created {
        Ok(task) => Some(task),
        Err(e) => {
            debug!("{} idles: {}", ctx.name_of(ctx.person), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{TaskBehavior, TaskState};
    use super::*;
    use crate::components::{LocationSituation, Malfunction};
    use crate::error::ClaimError;
    use hecs::EntityBuilder;

    /// Consumes time until `left` runs out.
    struct Work {
        left: f64,
    }

    impl TaskBehavior for Work {
        fn phase_name(&self) -> &'static str {
            "WORKING"
        }

        fn perform_phase(&mut self, _ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
            let used = time.min(self.left);
            self.left -= used;
            if self.left <= 0.0 {
                state.end_task();
            }
            time - used
        }
    }

    /// Queues a short sub-task on its first call, then works.
    struct Delegate {
        delegated: bool,
    }

    impl TaskBehavior for Delegate {
        fn phase_name(&self) -> &'static str {
            if self.delegated {
                "AFTER"
            } else {
                "BEFORE"
            }
        }

        fn perform_phase(&mut self, _ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
            if !self.delegated {
                self.delegated = true;
                state.add_sub_task(Task::new(TaskKind::Relax, TaskState::new("helper"), Work { left: 4.0 }));
                return time;
            }
            0.0
        }
    }

    fn ten(_: &TaskView) -> Result<f64, ClaimError> {
        Ok(10.0)
    }

    fn zero(_: &TaskView) -> Result<f64, ClaimError> {
        Ok(0.0)
    }

    fn nan(_: &TaskView) -> Result<f64, ClaimError> {
        Ok(f64::NAN)
    }

    fn broken(_: &TaskView) -> Result<f64, ClaimError> {
        Err(ClaimError::Unavailable("test"))
    }

    fn huge(_: &TaskView) -> Result<f64, ClaimError> {
        Ok(1.0e9)
    }

    fn make_workout(_: &mut TaskContext) -> Result<Task, ClaimError> {
        Ok(Task::new(
            TaskKind::Workout,
            TaskState::new("stub workout").effort_driven(),
            Work { left: 100.0 },
        ))
    }

    fn make_sleep(_: &mut TaskContext) -> Result<Task, ClaimError> {
        Ok(Task::new(TaskKind::Sleep, TaskState::new("stub sleep"), Work { left: 100.0 }))
    }

    fn make_delegate(_: &mut TaskContext) -> Result<Task, ClaimError> {
        Ok(Task::new(
            TaskKind::TendGreenhouse,
            TaskState::new("delegating"),
            Delegate { delegated: false },
        ))
    }

    fn refuse(_: &mut TaskContext) -> Result<Task, ClaimError> {
        Err(ClaimError::Unavailable("test"))
    }

    #[test]
    fn test_zero_weight_never_selected() {
        let mut fx = Fixture::new();
        let mut registry = TaskRegistry::new();
        registry
            .register(TaskKind::Sleep, zero, make_sleep)
            .register(TaskKind::Workout, ten, make_workout);
        let mut manager = TaskManager::new();
        for _ in 0..100 {
            let total = manager.get_total_task_probability(&fx.view(), &registry);
            assert_eq!(total, 10.0);
            let task = manager.get_new_task(&mut fx.ctx(), &registry, total).unwrap();
            assert_eq!(task.kind(), TaskKind::Workout);
        }
    }

    #[test]
    fn test_bad_weights_count_as_zero_and_are_capped() {
        let fx = Fixture::new();
        let mut registry = TaskRegistry::new();
        registry
            .register(TaskKind::Sleep, nan, make_sleep)
            .register(TaskKind::Relax, broken, make_sleep)
            .register(TaskKind::Workout, huge, make_workout);
        let mut manager = TaskManager::new();
        let total = manager.get_total_task_probability(&fx.view(), &registry);
        assert_eq!(total, fx.config.max_task_probability);
    }

    #[test]
    fn test_failed_factory_leaves_agent_idle() {
        let mut fx = Fixture::new();
        let mut registry = TaskRegistry::new();
        registry.register(TaskKind::Workout, ten, refuse);
        let mut manager = TaskManager::new();
        assert_eq!(manager.perform_task(&mut fx.ctx(), &registry, 5.0, 1.0), 5.0);
        assert!(!manager.has_active_task());
        assert!(fx.world.get::<&Activity>(fx.person).unwrap().is_idle());
    }

    #[test]
    fn test_effort_floor_applies() {
        let mut fx = Fixture::new();
        let mut registry = TaskRegistry::new();
        registry.register(TaskKind::Workout, ten, make_workout);
        let mut manager = TaskManager::new();
        manager.perform_task(&mut fx.ctx(), &registry, 10.0, 0.0);
        let done = manager.current_task().unwrap().state.time_completed;
        assert!((done - 1.0).abs() < 1e-9, "floor gives 10 x 0.1, got {}", done);

        manager.perform_task(&mut fx.ctx(), &registry, 10.0, 0.5);
        let done = manager.current_task().unwrap().state.time_completed;
        assert!((done - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_falls_back_to_relax_inside() {
        let mut fx = Fixture::new();
        let mut registry = TaskRegistry::new();
        registry.register(TaskKind::Sleep, zero, make_sleep);
        let mut manager = TaskManager::new();
        manager.perform_task(&mut fx.ctx(), &registry, 1.0, 1.0);
        assert_eq!(manager.current_task().map(|t| t.kind()), Some(TaskKind::Relax));
    }

    #[test]
    fn test_zero_total_outside_heads_for_airlock() {
        let mut fx = Fixture::new();
        fx.add_airlock();
        fx.set_situation(LocationSituation::Outside);
        fx.wear_suit();
        let registry = TaskRegistry::new();
        let mut manager = TaskManager::new();
        manager.perform_task(&mut fx.ctx(), &registry, 1.0, 1.0);
        assert_eq!(manager.current_task().map(|t| t.kind()), Some(TaskKind::EnterAirlock));
        let activity = fx.world.get::<&Activity>(fx.person).unwrap();
        assert_eq!(activity.kind, Some(TaskKind::EnterAirlock));
        assert_eq!(activity.phase, "DEPRESSURIZE_CHAMBER");
    }

    #[test]
    fn test_sub_task_runs_then_parent_resumes() {
        let mut fx = Fixture::new();
        let mut registry = TaskRegistry::new();
        registry.register(TaskKind::TendGreenhouse, ten, make_delegate);
        let mut manager = TaskManager::new();

        manager.perform_task(&mut fx.ctx(), &registry, 3.0, 1.0);
        assert_eq!(manager.depth(), 2);
        assert_eq!(manager.active_task().unwrap().kind(), TaskKind::Relax);
        let activity = Activity::clone(&fx.world.get::<&Activity>(fx.person).unwrap());
        assert_eq!(activity.kind, Some(TaskKind::TendGreenhouse));
        assert_eq!(activity.active, Some(TaskKind::Relax));

        // helper needs one more millisol, the parent gets the rest
        manager.perform_task(&mut fx.ctx(), &registry, 3.0, 1.0);
        assert_eq!(manager.depth(), 1);
        assert_eq!(manager.phase(), "AFTER");
        assert_eq!(manager.last_task(), Some(TaskKind::Relax));
    }

    #[test]
    fn test_add_task_rules() {
        let mut fx = Fixture::new();
        let mut manager = TaskManager::new();
        let relax = |name: &str| Task::new(TaskKind::Relax, TaskState::new(name), Work { left: 10.0 });
        let sleep = Task::new(TaskKind::Sleep, TaskState::new("nap"), Work { left: 10.0 });

        manager.add_task(&mut fx.ctx(), sleep, false);
        manager.add_task(&mut fx.ctx(), relax("first"), true);
        manager.add_task(&mut fx.ctx(), relax("second"), true);
        assert_eq!(manager.depth(), 2);
        assert_eq!(manager.description(), "first");

        manager.add_task(&mut fx.ctx(), relax("fresh"), false);
        assert_eq!(manager.depth(), 1);
        assert!(!manager.has_task(TaskKind::Sleep));

        manager.end_sub_task(&mut fx.ctx());
        assert_eq!(manager.depth(), 1, "the top-level task is not a sub-task");
        manager.end_current_task(&mut fx.ctx());
        assert!(!manager.has_active_task());
        assert_eq!(manager.last_task(), Some(TaskKind::Relax));
    }

    #[test]
    fn test_emergency_preempts_and_work_resumes() {
        let mut fx = Fixture::new();
        let mut functions = EntityBuilder::new();
        functions.add(crate::components::Quarters {
            beds: crate::components::Slots::new(2),
        });
        let hab = fx.add_building("Hab", true, functions);
        fx.store(crate::components::Resource::SpareParts, 10.0);
        let mut registry = TaskRegistry::new();
        registry.register(TaskKind::Workout, ten, make_workout);
        let mut manager = TaskManager::new();
        manager.perform_task(&mut fx.ctx(), &registry, 5.0, 1.0);
        assert_eq!(manager.depth(), 1);

        fx.world
            .get::<&mut MalfunctionManager>(hab)
            .unwrap()
            .malfunctions
            .push(Malfunction::emergency("Air Leak", 5.0));
        manager.perform_task(&mut fx.ctx(), &registry, 5.0, 1.0);
        assert_eq!(manager.depth(), 2);
        assert_eq!(manager.active_task().unwrap().kind(), TaskKind::RepairEmergencyMalfunction);
        assert_eq!(manager.current_task().unwrap().kind(), TaskKind::Workout);

        for _ in 0..20 {
            manager.perform_task(&mut fx.ctx(), &registry, 5.0, 1.0);
            if manager.depth() == 1 {
                break;
            }
        }
        assert_eq!(manager.depth(), 1);
        assert!(!fx.world.get::<&MalfunctionManager>(hab).unwrap().has_emergency_malfunction());
        let workout = manager.current_task().unwrap();
        assert_eq!(workout.kind(), TaskKind::Workout);
        assert!(!workout.is_done());
    }
}
