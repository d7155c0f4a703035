//! Teach a colonist while they work.
//!
//! The teacher attaches itself to the student's [`Activity`]; the student's
//! experience gain reads it from there. Teaching ends as soon as the
//! student moves on to something else.

use hecs::Entity;
use log::debug;

use marsbase_logic::skills::{NaturalAttribute, SkillType};
use marsbase_logic::weights;

use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::components::Activity;
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

const TEACHING_SHIFT: f64 = 100.0;

/// Residents doing teachable work with nobody teaching them.
fn students(view: &TaskView) -> Vec<Entity> {
    let Some(settlement) = view.settlement() else {
        return Vec::new();
    };
    view.residents(settlement)
        .into_iter()
        .filter(|&p| p != view.person)
        .filter(|&p| {
            view.world
                .get::<&Activity>(p)
                .map(|a| a.is_teachable())
                .unwrap_or(false)
        })
        .collect()
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    Ok(weights::teach(students(view).len()))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let student = students(&ctx.view())
        .first()
        .copied()
        .ok_or(ClaimError::Unavailable("no students"))?;
    let lesson = {
        let mut activity = ctx.world.get::<&mut Activity>(student)?;
        if let Some(teacher) = activity.teacher {
            return Err(ClaimError::AlreadyClaimed(teacher));
        }
        activity.teacher = Some(ctx.person);
        activity.kind
    };
    let description = format!("Teaching {}", ctx.name_of(student));
    Ok(Task::new(
        TaskKind::Teach,
        TaskState::new(description)
            .with_stress(0.1)
            .with_duration(TEACHING_SHIFT)
            .with_skills(&[SkillType::Teaching])
            .with_experience_attribute(NaturalAttribute::Teaching),
        Teach { student, lesson },
    ))
}

pub struct Teach {
    student: Entity,
    /// What the student was doing when the lesson began.
    lesson: Option<TaskKind>,
}

impl TaskBehavior for Teach {
    fn phase_name(&self) -> &'static str {
        "TEACHING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        let still_teaching = ctx
            .world
            .get::<&Activity>(self.student)
            .map(|a| a.kind == self.lesson && a.teacher == Some(person))
            .unwrap_or(false);
        if !still_teaching {
            debug!("{} has moved on, lesson over", ctx.name_of(self.student));
            state.end_task();
            return time;
        }
        0.0
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        if let Ok(mut activity) = ctx.world.get::<&mut Activity>(self.student) {
            if activity.teacher == Some(ctx.person) {
                activity.teacher = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    fn busy_student(fx: &mut Fixture, kind: TaskKind) -> Entity {
        let student = fx.add_person("Student");
        fx.world.get::<&mut Activity>(student).unwrap().kind = Some(kind);
        student
    }

    #[test]
    fn test_only_teachable_work_counts() {
        let mut fx = Fixture::new();
        busy_student(&mut fx, TaskKind::Sleep);
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        busy_student(&mut fx, TaskKind::ResearchScience);
        busy_student(&mut fx, TaskKind::TendGreenhouse);
        assert_eq!(weight(&fx.view()).unwrap(), 40.0);
    }

    #[test]
    fn test_lesson_ends_when_student_moves_on() {
        let mut fx = Fixture::new();
        let student = busy_student(&mut fx, TaskKind::ResearchScience);
        let mut task = create(&mut fx.ctx()).unwrap();
        assert_eq!(fx.world.get::<&Activity>(student).unwrap().teacher, Some(fx.person));
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);

        assert_eq!(fx.step(&mut task, 10.0, None), 0.0);
        fx.world.get::<&mut Activity>(student).unwrap().kind = Some(TaskKind::Sleep);
        assert_eq!(fx.step(&mut task, 10.0, None), 10.0);
        assert!(task.is_done());
        task.clear_down(&mut fx.ctx());
        assert_eq!(fx.world.get::<&Activity>(student).unwrap().teacher, None);
    }

    #[test]
    fn test_teaching_speeds_up_learning() {
        let mut fx = Fixture::new();
        let student = busy_student(&mut fx, TaskKind::ResearchScience);
        fx.set_skill(SkillType::Teaching, 2);
        let _task = create(&mut fx.ctx()).unwrap();

        let state = TaskState::new("study").with_skills(&[SkillType::Physics]);
        super::super::add_experience(&mut fx.ctx_for(student), &state, 10.0);
        let gained = fx
            .world
            .get::<&marsbase_logic::skills::SkillManager>(student)
            .unwrap()
            .experience(SkillType::Physics);
        // 10 / 100 x (1 + (2 + 50) / 100)
        assert!((gained - 0.152).abs() < 1e-9, "{}", gained);
    }
}
