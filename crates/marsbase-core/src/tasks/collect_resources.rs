//! Collect ice or regolith on the surface around the settlement.
//!
//! The collector takes an empty container from settlement storage, walks
//! out to the site, fills the container and walks back. Whatever was
//! collected is unloaded into storage after re-entry, or on clear-down if
//! the trip was cut short.

use hecs::Entity;
use log::{info, warn};

use marsbase_logic::skills::SkillType;
use marsbase_logic::weights;
use marsbase_logic::work::work_rate_modifier;

use super::eva::{can_exit_airlock, EvaOperation};
use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{find_container, move_unit, transfer, Inventory, Resource};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Collection rates in kg per millisol.
pub const ICE_COLLECTION_RATE: f64 = 1.0;
pub const REGOLITH_COLLECTION_RATE: f64 = 1.5;
/// Ice is far more plentiful near the poles.
const POLAR_ICE_FACTOR: f64 = 3.0;
/// Walk from the airlock to the collection site.
const SITE_WALK_TIME: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ExitAirlock,
    WalkToSite,
    CollectResources,
    WalkToBase,
    EnterAirlock,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::ExitAirlock => "EXIT_AIRLOCK",
            Phase::WalkToSite => "WALK_TO_SITE",
            Phase::CollectResources => "COLLECT_RESOURCES",
            Phase::WalkToBase => "WALK_TO_BASE",
            Phase::EnterAirlock => "ENTER_AIRLOCK",
        }
    }
}

fn collection_weight(view: &TaskView, resource: Resource) -> f64 {
    let Some(settlement) = view.settlement() else {
        return 0.0;
    };
    let Ok((stock, capacity)) = view
        .world
        .get::<&Inventory>(settlement)
        .map(|inv| (inv.amount(resource), inv.capacity(resource)))
    else {
        return 0.0;
    };
    let can_collect = find_container(view.world, settlement, resource).is_some()
        && (!view.is_dark() || view.in_dark_polar_region())
        && EvaOperation::new(view)
            .map(|eva| can_exit_airlock(view, eva.airlock, eva.host))
            .unwrap_or(false);
    weights::collect_resource(stock, capacity, can_collect)
}

pub fn ice_weight(view: &TaskView) -> Result<f64, ClaimError> {
    Ok(collection_weight(view, Resource::Ice))
}

pub fn regolith_weight(view: &TaskView) -> Result<f64, ClaimError> {
    Ok(collection_weight(view, Resource::Regolith))
}

pub fn create_ice(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    create(ctx, Resource::Ice)
}

pub fn create_regolith(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
    create(ctx, Resource::Regolith)
}

fn create(ctx: &mut TaskContext, resource: Resource) -> Result<Task, ClaimError> {
    let view = ctx.view();
    let settlement = view.settlement().ok_or(ClaimError::Unavailable("not in a settlement"))?;
    let eva = EvaOperation::new(&view)?;
    if !can_exit_airlock(&view, eva.airlock, eva.host) {
        return Err(ClaimError::Unavailable("cannot get outside"));
    }
    let container = find_container(view.world, settlement, resource).ok_or(ClaimError::NoUnitAvailable("container"))?;
    move_unit(ctx.world, container, settlement, ctx.person)?;

    let (kind, rate) = match resource {
        Resource::Ice => (TaskKind::CollectIce, ICE_COLLECTION_RATE),
        _ => (TaskKind::CollectRegolith, REGOLITH_COLLECTION_RATE),
    };
    Ok(Task::new(
        kind,
        TaskState::new(format!("Collecting {}", resource.name()))
            .effort_driven()
            .with_stress(0.5)
            .with_skills(&[SkillType::EvaOperations, SkillType::Areology]),
        CollectResources {
            phase: Phase::ExitAirlock,
            eva,
            resource,
            rate,
            container,
            walked: 0.0,
        },
    ))
}

pub struct CollectResources {
    phase: Phase,
    eva: EvaOperation,
    resource: Resource,
    rate: f64,
    container: Entity,
    /// Distance from the airlock, in walking millisols.
    walked: f64,
}

impl CollectResources {
    fn exit_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let remaining = self.eva.exit_airlock(ctx, state, time);
        if self.eva.exited {
            self.phase = Phase::WalkToSite;
        }
        remaining
    }

    fn walk_to_site(&mut self, ctx: &mut TaskContext, time: f64) -> f64 {
        if self.eva.should_end(ctx).is_some() {
            self.phase = Phase::WalkToBase;
            return time;
        }
        let used = (SITE_WALK_TIME - self.walked).max(0.0).min(time);
        self.eva.check_for_accident(ctx, used);
        self.walked += used;
        if self.walked >= SITE_WALK_TIME {
            self.phase = Phase::CollectResources;
        }
        time - used
    }

    fn collect(&mut self, ctx: &mut TaskContext, time: f64) -> f64 {
        if self.eva.should_end(ctx).is_some() {
            self.phase = Phase::WalkToBase;
            return time;
        }
        self.eva.check_for_accident(ctx, time);

        let view = ctx.view();
        let mut amount = work_rate_modifier(view.effective_skill(SkillType::Areology), time) * self.rate;
        if self.resource == Resource::Ice && view.surface.in_polar_region(&view.coordinates()) {
            amount *= POLAR_ICE_FACTOR;
        }
        let full = match ctx.world.get::<&mut Inventory>(self.container) {
            Ok(mut container) => {
                container.store_up_to(self.resource, amount);
                container.remaining_capacity(self.resource) <= 0.0
            }
            Err(_) => true,
        };
        if full {
            self.phase = Phase::WalkToBase;
        }
        0.0
    }

    fn walk_to_base(&mut self, ctx: &mut TaskContext, time: f64) -> f64 {
        let used = self.walked.min(time);
        self.eva.check_for_accident(ctx, used);
        self.walked -= used;
        if self.walked <= 0.0 {
            self.phase = Phase::EnterAirlock;
        }
        time - used
    }

    fn enter_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let remaining = self.eva.enter_airlock(ctx, state, time);
        if self.eva.entered {
            self.unload(ctx);
            state.end_task();
        }
        remaining
    }

    /// Empty the container into host storage and put it back there.
    fn unload(&mut self, ctx: &mut TaskContext) {
        let person = ctx.person;
        let held = ctx
            .world
            .get::<&Inventory>(person)
            .map(|inv| inv.has_unit(self.container))
            .unwrap_or(false);
        if !held {
            return;
        }
        let host = self.eva.host;
        let collected = ctx
            .world
            .get::<&Inventory>(self.container)
            .map(|inv| inv.amount(self.resource))
            .unwrap_or(0.0);
        if collected > 0.0 {
            match transfer(ctx.world, self.container, host, self.resource, collected) {
                Ok(stored) => info!(
                    "{} brought in {:.1} kg of {}",
                    ctx.name_of(person),
                    stored,
                    self.resource.name()
                ),
                Err(e) => warn!("{} could not unload {}: {}", ctx.name_of(person), self.resource.name(), e),
            }
        }
        if let Err(e) = move_unit(ctx.world, self.container, person, host) {
            warn!("{} could not return container: {}", ctx.name_of(person), e);
        }
    }
}

impl TaskBehavior for CollectResources {
    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        match self.phase {
            Phase::ExitAirlock => self.exit_airlock(ctx, state, time),
            Phase::WalkToSite => self.walk_to_site(ctx, time),
            Phase::CollectResources => self.collect(ctx, time),
            Phase::WalkToBase => self.walk_to_base(ctx, time),
            Phase::EnterAirlock => self.enter_airlock(ctx, state, time),
        }
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        self.unload(ctx);
    }
}
