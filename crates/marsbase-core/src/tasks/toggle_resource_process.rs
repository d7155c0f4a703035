//! Switch a resource process on or off when the goods economy says so.
//!
//! Processes in buildings without life support are only reachable on
//! foot, so the task becomes an EVA: out through the airlock, flip the
//! switch, back in.

use hecs::Entity;
use log::info;

use marsbase_logic::skills::SkillType;
use marsbase_logic::weights::{self, ToggleInputs};
use marsbase_logic::work::work_rate_modifier;

use super::eva::{can_exit_airlock, EvaOperation};
use super::{check_for_accident, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{Building, ResourceProcessing, Settlement};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ExitAirlock,
    ToggleProcess,
    EnterAirlock,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::ExitAirlock => "EXIT_AIRLOCK",
            Phase::ToggleProcess => "TOGGLE_PROCESS",
            Phase::EnterAirlock => "ENTER_AIRLOCK",
        }
    }
}

/// The process most worth flipping: building, process index, value gain
/// and whether the building has life support.
fn best_toggle(view: &TaskView) -> Option<(Entity, usize, f64, bool)> {
    let settlement = view.settlement()?;
    view.buildings_with::<ResourceProcessing>(settlement)
        .into_iter()
        .filter_map(|b| {
            let (index, value) = view.world.get::<&ResourceProcessing>(b).ok()?.best_toggle()?;
            let life_support = view.world.get::<&Building>(b).map(|b| b.life_support).unwrap_or(false);
            Some((b, index, value, life_support))
        })
        .max_by(|a, b| a.2.total_cmp(&b.2))
}

fn overcrowded(view: &TaskView, settlement: Entity) -> bool {
    let capacity = view
        .world
        .get::<&Settlement>(settlement)
        .map(|s| s.population_capacity)
        .unwrap_or(usize::MAX);
    view.residents(settlement).len() > capacity
}

/// Can the person get outside right now.
fn eva_possible(view: &TaskView) -> bool {
    EvaOperation::new(view)
        .map(|eva| can_exit_airlock(view, eva.airlock, eva.host))
        .unwrap_or(false)
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let Some((_, _, value_diff, life_support)) = best_toggle(view) else {
        return Ok(0.0);
    };
    let Some(settlement) = view.settlement() else {
        return Ok(0.0);
    };
    let needs_eva = !life_support;
    if needs_eva && !eva_possible(view) {
        return Ok(0.0);
    }
    Ok(weights::toggle_resource_process(&ToggleInputs {
        value_diff,
        needs_eva,
        sunlight: !view.is_dark(),
        dark_polar_region: view.in_dark_polar_region(),
        overcrowded: overcrowded(view, settlement),
        performance: view.performance(),
    }))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let view = ctx.view();
    let (building, process, _, life_support) =
        best_toggle(&view).ok_or(ClaimError::Unavailable("no process worth toggling"))?;
    let eva = if life_support {
        None
    } else {
        let eva = EvaOperation::new(&view)?;
        if !can_exit_airlock(&view, eva.airlock, eva.host) {
            return Err(ClaimError::Unavailable("cannot get outside"));
        }
        Some(eva)
    };
    let process_name = ctx
        .world
        .get::<&ResourceProcessing>(building)?
        .processes
        .get(process)
        .map(|p| p.name.clone())
        .unwrap_or_default();
    let description = format!("Toggling {} at {}", process_name, ctx.name_of(building));
    let phase = if eva.is_some() {
        Phase::ExitAirlock
    } else {
        Phase::ToggleProcess
    };
    Ok(Task::new(
        TaskKind::ToggleResourceProcess,
        TaskState::new(description)
            .effort_driven()
            .with_stress(0.25)
            .with_skills(&[SkillType::Mechanics]),
        ToggleResourceProcess {
            phase,
            building,
            process,
            eva,
        },
    ))
}

pub struct ToggleResourceProcess {
    phase: Phase,
    building: Entity,
    process: usize,
    eva: Option<EvaOperation>,
}

impl ToggleResourceProcess {
    fn exit_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let Some(eva) = self.eva.as_mut() else {
            self.phase = Phase::ToggleProcess;
            return time;
        };
        let remaining = eva.exit_airlock(ctx, state, time);
        if eva.exited {
            self.phase = Phase::ToggleProcess;
        }
        remaining
    }

    fn toggle_process(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        if let Some(eva) = self.eva.as_ref() {
            if eva.should_end(ctx).is_some() {
                self.phase = Phase::EnterAirlock;
                return time;
            }
            eva.check_for_accident(ctx, time);
        } else {
            check_for_accident(ctx, self.building, SkillType::Mechanics, time);
        }

        let work = work_rate_modifier(ctx.effective_skill(SkillType::Mechanics), time);
        let flipped = match ctx.world.get::<&mut ResourceProcessing>(self.building) {
            Ok(mut processing) => match processing.processes.get_mut(self.process) {
                // someone else already flipped it
                Some(p) if p.toggle_progress <= 0.0 && p.value_diff <= 0.0 => None,
                Some(p) => Some((p.add_toggle_work(work), p.name.clone(), p.running)),
                None => None,
            },
            Err(_) => None,
        };
        match flipped {
            Some((false, _, _)) => 0.0,
            Some((true, name, running)) => {
                info!(
                    "{} turned {} {}",
                    ctx.name_of(ctx.person),
                    name,
                    if running { "on" } else { "off" }
                );
                self.finish(state);
                0.0
            }
            None => {
                self.finish(state);
                time
            }
        }
    }

    fn finish(&mut self, state: &mut TaskState) {
        if self.eva.is_some() {
            self.phase = Phase::EnterAirlock;
        } else {
            state.end_task();
        }
    }

    fn enter_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let Some(eva) = self.eva.as_mut() else {
            state.end_task();
            return time;
        };
        let remaining = eva.enter_airlock(ctx, state, time);
        if eva.entered {
            state.end_task();
        }
        remaining
    }
}

impl TaskBehavior for ToggleResourceProcess {
    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        match self.phase {
            Phase::ExitAirlock => self.exit_airlock(ctx, state, time),
            Phase::ToggleProcess => self.toggle_process(ctx, state, time),
            Phase::EnterAirlock => self.enter_airlock(ctx, state, time),
        }
    }
}
