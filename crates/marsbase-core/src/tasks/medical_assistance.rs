//! Treat a sick or injured colonist at the infirmary.

use hecs::Entity;
use log::info;

use marsbase_logic::skills::{NaturalAttribute, SkillType};
use marsbase_logic::weights;
use marsbase_logic::work::work_rate_modifier;

use super::{unused_time, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{HealthProblem, Infirmary};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

const TREATMENT_SHIFT: f64 = 40.0;

/// Residents other than the doctor waiting for treatment.
fn patients(view: &TaskView) -> Vec<Entity> {
    let Some(settlement) = view.settlement() else {
        return Vec::new();
    };
    view.residents(settlement)
        .into_iter()
        .filter(|&p| p != view.person)
        .filter(|&p| {
            view.world
                .get::<&HealthProblem>(p)
                .map(|h| h.awaiting_treatment())
                .unwrap_or(false)
        })
        .collect()
}

fn has_infirmary(view: &TaskView) -> bool {
    view.settlement()
        .map(|s| !view.habitable_buildings_with::<Infirmary>(s).is_empty())
        .unwrap_or(false)
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    Ok(weights::medical_assistance(
        patients(view).len(),
        has_infirmary(view),
        view.performance(),
    ))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let view = ctx.view();
    if !has_infirmary(&view) {
        return Err(ClaimError::Unavailable("no infirmary"));
    }
    let patient = patients(&view)
        .first()
        .copied()
        .ok_or(ClaimError::Unavailable("nobody needs treatment"))?;
    claim_patient(ctx, patient)?;
    let description = format!("Treating {}", ctx.name_of(patient));
    Ok(Task::new(
        TaskKind::MedicalAssistance,
        TaskState::new(description)
            .effort_driven()
            .with_stress(1.0)
            .with_duration(TREATMENT_SHIFT)
            .with_skills(&[SkillType::Medicine])
            .with_experience_attribute(NaturalAttribute::AcademicAptitude),
        MedicalAssistance { patient },
    ))
}

fn claim_patient(ctx: &mut TaskContext, patient: Entity) -> Result<(), ClaimError> {
    let mut problem = ctx.world.get::<&mut HealthProblem>(patient)?;
    if let Some(doctor) = problem.doctor {
        return Err(ClaimError::AlreadyClaimed(doctor));
    }
    problem.doctor = Some(ctx.person);
    Ok(())
}

pub struct MedicalAssistance {
    patient: Entity,
}

impl TaskBehavior for MedicalAssistance {
    fn phase_name(&self) -> &'static str {
        "TREATMENT"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let work = work_rate_modifier(ctx.effective_skill(SkillType::Medicine), time);
        let person = ctx.person;
        let outcome = match ctx.world.get::<&mut HealthProblem>(self.patient) {
            Ok(mut problem) if problem.doctor == Some(person) => {
                let leftover = problem.treat(work);
                Some((leftover, problem.cured))
            }
            _ => None,
        };
        match outcome {
            Some((_, false)) => 0.0,
            Some((leftover, true)) => {
                info!("{} cured {}", ctx.name_of(person), ctx.name_of(self.patient));
                let _ = ctx.world.remove_one::<HealthProblem>(self.patient);
                state.end_task();
                unused_time(time, work, leftover)
            }
            None => {
                state.end_task();
                time
            }
        }
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        if let Ok(mut problem) = ctx.world.get::<&mut HealthProblem>(self.patient) {
            if problem.doctor == Some(ctx.person) {
                problem.doctor = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::Slots;
    use hecs::EntityBuilder;

    fn add_infirmary(fx: &mut Fixture) {
        let mut functions = EntityBuilder::new();
        functions.add(Infirmary { beds: Slots::new(2) });
        fx.add_building("Infirmary", true, functions);
    }

    #[test]
    fn test_weight_needs_patients_and_infirmary() {
        let mut fx = Fixture::new();
        let patient = fx.add_person("Patient");
        fx.world.insert_one(patient, HealthProblem::new("Frostbite", 20.0)).unwrap();
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        add_infirmary(&mut fx);
        assert_eq!(weight(&fx.view()).unwrap(), 100.0);
    }

    #[test]
    fn test_treatment_cures_and_patient_is_claimed_once() {
        let mut fx = Fixture::new();
        add_infirmary(&mut fx);
        fx.set_skill(SkillType::Medicine, 1);
        let patient = fx.add_person("Patient");
        fx.world.insert_one(patient, HealthProblem::new("Frostbite", 12.0)).unwrap();
        let mut task = create(&mut fx.ctx()).unwrap();

        let second_doctor = fx.add_person("Second");
        assert!(create(&mut fx.ctx_for(second_doctor)).is_err());

        assert_eq!(fx.step(&mut task, 10.0, None), 0.0);
        let left = fx.step(&mut task, 10.0, None);
        assert!(task.is_done());
        assert!((left - 8.0).abs() < 1e-9);
        assert!(fx.world.get::<&HealthProblem>(patient).is_err());
    }

    #[test]
    fn test_clear_down_releases_patient() {
        let mut fx = Fixture::new();
        add_infirmary(&mut fx);
        let patient = fx.add_person("Patient");
        fx.world.insert_one(patient, HealthProblem::new("Frostbite", 12.0)).unwrap();
        let mut task = create(&mut fx.ctx()).unwrap();
        task.clear_down(&mut fx.ctx());
        assert!(fx.world.get::<&HealthProblem>(patient).unwrap().awaiting_treatment());
    }
}
