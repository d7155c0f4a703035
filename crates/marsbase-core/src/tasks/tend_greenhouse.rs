//! Tend the crops of the neediest greenhouse.

use hecs::Entity;
use log::debug;

use marsbase_logic::skills::SkillType;
use marsbase_logic::weights;
use marsbase_logic::work::work_rate_modifier;

use super::{check_for_accident, unused_time, Task, TaskBehavior, TaskKind, TaskState};
use crate::components::Greenhouse;
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

const TENDING_SHIFT: f64 = 30.0;

fn greenhouses(view: &TaskView) -> Vec<(Entity, f64)> {
    let Some(settlement) = view.settlement() else {
        return Vec::new();
    };
    view.habitable_buildings_with::<Greenhouse>(settlement)
        .into_iter()
        .filter_map(|b| {
            let work = view.world.get::<&Greenhouse>(b).ok()?.outstanding_work();
            Some((b, work))
        })
        .collect()
}

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let outstanding: f64 = greenhouses(view).iter().map(|&(_, w)| w).sum();
    Ok(weights::tend_greenhouse(outstanding, view.performance()))
}

pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let greenhouse = greenhouses(&ctx.view())
        .into_iter()
        .filter(|&(_, w)| w > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(g, _)| g)
        .ok_or(ClaimError::Unavailable("no crops need tending"))?;
    let description = format!("Tending {}", ctx.name_of(greenhouse));
    Ok(Task::new(
        TaskKind::TendGreenhouse,
        TaskState::new(description)
            .effort_driven()
            .with_stress(-0.1)
            .with_duration(TENDING_SHIFT)
            .with_skills(&[SkillType::Botany]),
        TendGreenhouse { greenhouse },
    ))
}

pub struct TendGreenhouse {
    greenhouse: Entity,
}

impl TaskBehavior for TendGreenhouse {
    fn phase_name(&self) -> &'static str {
        "TENDING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let work = work_rate_modifier(ctx.effective_skill(SkillType::Botany), time);
        let outcome = match ctx.world.get::<&mut Greenhouse>(self.greenhouse) {
            Ok(mut g) => {
                let leftover = g.add_work(work);
                Some((leftover, g.outstanding_work() <= 0.0))
            }
            Err(_) => None,
        };
        let Some((leftover, caught_up)) = outcome else {
            state.end_task();
            return time;
        };
        check_for_accident(ctx, self.greenhouse, SkillType::Botany, time);
        if caught_up {
            debug!("{} is fully tended", ctx.name_of(self.greenhouse));
            state.end_task();
            return unused_time(time, work, leftover);
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::Crop;
    use hecs::EntityBuilder;

    fn add_greenhouse(fx: &mut Fixture, needs: &[f64]) -> Entity {
        let crops = needs
            .iter()
            .map(|&need| {
                let mut crop = Crop::new("Soybean");
                crop.work_needed = need;
                crop
            })
            .collect();
        let mut functions = EntityBuilder::new();
        functions.add(Greenhouse::new(crops, 0.1));
        fx.add_building("Greenhouse", true, functions)
    }

    #[test]
    fn test_weight_from_outstanding_work() {
        let mut fx = Fixture::new();
        assert_eq!(weight(&fx.view()).unwrap(), 0.0);
        add_greenhouse(&mut fx, &[100.0, 50.0]);
        assert_eq!(weight(&fx.view()).unwrap(), 20.0);
        fx.set_performance(0.5);
        assert_eq!(weight(&fx.view()).unwrap(), 10.0);
    }

    #[test]
    fn test_work_goes_to_neediest_crop() {
        let mut fx = Fixture::new();
        fx.config.base_accident_chance = 0.0;
        fx.set_skill(SkillType::Botany, 1);
        let greenhouse = add_greenhouse(&mut fx, &[4.0, 10.0]);
        let mut task = create(&mut fx.ctx()).unwrap();
        fx.step(&mut task, 8.0, None);
        {
            let g = fx.world.get::<&Greenhouse>(greenhouse).unwrap();
            assert_eq!(g.crops[0].work_needed, 4.0);
            assert_eq!(g.crops[1].work_needed, 2.0);
        }
        let left = fx.step(&mut task, 10.0, None);
        assert!(task.is_done());
        assert!((left - 4.0).abs() < 1e-9);
    }
}
