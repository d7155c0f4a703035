//! Research in a laboratory, in the science the researcher knows best.

use hecs::Entity;
use log::debug;

use marsbase_logic::skills::NaturalAttribute;
use marsbase_logic::weights;
use marsbase_logic::work::work_rate_modifier;

use super::{check_for_accident, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{Laboratory, ScienceType};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

const RESEARCH_SHIFT: f64 = 50.0;

/// Best (lab, science, skill level) among labs with a free place.
fn best_lab(view: &TaskView) -> Option<(Entity, ScienceType, u32)> {
    let settlement = view.settlement()?;
    let mut best: Option<(Entity, ScienceType, u32)> = None;
    for lab in view.habitable_buildings_with::<Laboratory>(settlement) {
        let Ok(laboratory) = view.world.get::<&Laboratory>(lab) else {
            continue;
        };
        if laboratory.researchers.is_full() {
            continue;
        }
        for &science in &laboratory.sciences {
            let level = view.skill_level(science.skill());
            if best.map(|(_, _, l)| level > l).unwrap_or(true) {
                best = Some((lab, science, level));
            }
        }
    }
    best
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let skill = best_lab(view).map(|(_, _, level)| level);
    Ok(weights::research(skill, view.performance()))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let (lab, science, _) = best_lab(&ctx.view()).ok_or(ClaimError::NoVacancy("laboratory"))?;
    ctx.world.get::<&mut Laboratory>(lab)?.researchers.claim(ctx.person, "laboratory")?;
    let description = format!("Researching {} in {}", science.name(), ctx.name_of(lab));
    Ok(Task::new(
        TaskKind::ResearchScience,
        TaskState::new(description)
            .effort_driven()
            .with_stress(0.2)
            .with_duration(RESEARCH_SHIFT)
            .with_skills(&[science.skill()])
            .with_experience_attribute(NaturalAttribute::AcademicAptitude),
        ResearchScience { lab, science },
    ))
}

pub struct ResearchScience {
    lab: Entity,
    science: ScienceType,
}

impl TaskBehavior for ResearchScience {
    fn phase_name(&self) -> &'static str {
        "RESEARCHING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let skill = self.science.skill();
        let work = work_rate_modifier(ctx.effective_skill(skill), time);
        match ctx.world.get::<&mut Laboratory>(self.lab) {
            Ok(mut lab) => lab.add_research(self.science, work),
            Err(_) => {
                state.end_task();
                return time;
            }
        }
        if check_for_accident(ctx, self.lab, skill, time) {
            debug!("{} interrupted by an accident", state.description);
            state.end_task();
        }
        0.0
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        if let Ok(mut lab) = ctx.world.get::<&mut Laboratory>(self.lab) {
            lab.researchers.release(ctx.person);
        }
    }
}
