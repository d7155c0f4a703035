//! Eat a meal from the local food store.

use log::debug;

use marsbase_logic::condition::PhysicalCondition;
use marsbase_logic::weights;

use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{Inventory, Resource};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Food in one full meal, kg.
pub const MEAL_MASS: f64 = 0.62;
const MEAL_TIME: f64 = 20.0;

pub fn weight(view: &TaskView) -> Result<f64, ClaimError> {
    let condition = view.condition()?;
    let food_available = view
        .local_inventory()
        .map(|holder| view.amount_at(holder, Resource::Food) > 0.0)
        .unwrap_or(false);
    Ok(weights::eat_meal(condition.hunger, food_available, view.is_outside()))
}

/// Claims the food up front; a short larder gives a smaller meal.
pub fn create(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    let view = ctx.view();
    let larder = view
        .local_inventory()
        .ok_or(ClaimError::Unavailable("nowhere to eat"))?;
    let hunger = view.condition()?.hunger;
    let portion = ctx.world.get::<&mut Inventory>(larder)?.retrieve_up_to(Resource::Food, MEAL_MASS);
    if portion <= 0.0 {
        return Err(ClaimError::InsufficientResource {
            resource: Resource::Food,
            requested: MEAL_MASS,
            available: 0.0,
        });
    }
    debug!("{} takes {:.2} kg of food", ctx.name_of(ctx.person), portion);
    let relief = hunger * (portion / MEAL_MASS).min(1.0);
    Ok(Task::new(
        TaskKind::EatMeal,
        TaskState::new("Eating a meal").with_stress(-1.2).with_duration(MEAL_TIME),
        EatMeal {
            relief_rate: relief / MEAL_TIME,
        },
    ))
}

pub struct EatMeal {
    /// Hunger relieved per millisol of eating.
    relief_rate: f64,
}

impl TaskBehavior for EatMeal {
    fn phase_name(&self) -> &'static str {
        "EATING"
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        match ctx.world.get::<&mut PhysicalCondition>(ctx.person) {
            Ok(mut condition) => condition.reduce_hunger(self.relief_rate * time),
            Err(_) => state.end_task(),
        }
        0.0
    }
}
