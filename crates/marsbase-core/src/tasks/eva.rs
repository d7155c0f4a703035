//! EVA protocol shared by every outdoor task.
//!
//! An EVA task embeds an [`EvaOperation`] and runs
//! `EXIT_AIRLOCK -> <work phases> -> ENTER_AIRLOCK`. The two airlock
//! phases delegate the actual transit to the [`ExitAirlock`] and
//! [`EnterAirlock`] sub-tasks. Work phases call
//! [`EvaOperation::should_end`] before anything else each tick and head
//! back to the airlock as soon as it fires.

use hecs::{Entity, World};
use log::{info, warn};

use marsbase_logic::accident::{accident_chance, accident_triggered};
use marsbase_logic::eva::{should_end_eva, EvaAbortReason, EvaConditions};
use marsbase_logic::skills::SkillType;

use super::{EnterAirlock, ExitAirlock, TaskState};
use crate::components::{find_good_suit, find_suit, suit_reading, Airlock, MalfunctionManager, Settlement};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

/// Airlock progress of an EVA task.
#[derive(Debug, Clone)]
pub struct EvaOperation {
    pub host: Entity,
    pub airlock: Entity,
    pub exited: bool,
    pub entered: bool,
    exit_attempted: bool,
}

impl EvaOperation {
    /// Bind to the airlock of the person's current host.
    pub fn new(view: &TaskView) -> Result<Self, ClaimError> {
        let host = view
            .location()?
            .host()
            .ok_or(ClaimError::Unavailable("no settlement or vehicle to leave from"))?;
        let airlock = find_airlock(view.world, host).ok_or(ClaimError::Unavailable("no airlock"))?;
        Ok(Self {
            host,
            airlock,
            exited: false,
            entered: false,
            exit_attempted: false,
        })
    }

    /// Get the person outside.
    ///
    /// Already outside: marks the exit done and uses the whole quantum.
    /// Otherwise queues an [`ExitAirlock`] sub-task and hands all the time
    /// to it, or ends the task when no exit is possible.
    pub fn exit_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let view = ctx.view();
        if view.is_outside() {
            self.exited = true;
            return 0.0;
        }
        if self.exit_attempted {
            info!("{} could not get outside, giving up on {}", ctx.name_of(ctx.person), state.description);
            state.end_task();
            return time;
        }
        if !can_exit_airlock(&view, self.airlock, self.host) {
            info!("{} cannot exit through {}", ctx.name_of(ctx.person), ctx.name_of(self.airlock));
            state.end_task();
            return time;
        }
        self.exit_attempted = true;
        let sub_task = ExitAirlock::create(&view, self.airlock, self.host);
        state.add_sub_task(sub_task);
        time
    }

    /// Get the person back inside. Symmetric to [`Self::exit_airlock`].
    pub fn enter_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let view = ctx.view();
        if !view.is_outside() {
            self.entered = true;
            return 0.0;
        }
        if !can_enter_airlock(&view, self.airlock) {
            info!("{} cannot get into {}", ctx.name_of(ctx.person), ctx.name_of(self.airlock));
            state.end_task();
            return time;
        }
        let sub_task = EnterAirlock::create(&view, self.airlock, self.host);
        state.add_sub_task(sub_task);
        time
    }

    /// Safety interrupt, checked before any outdoor work each tick.
    pub fn should_end(&self, ctx: &TaskContext) -> Option<EvaAbortReason> {
        let view = ctx.view();
        let conditions = EvaConditions {
            solar_irradiance: view.solar_irradiance(),
            in_dark_polar_region: view.in_dark_polar_region(),
            suit: find_suit(view.world, ctx.person).and_then(|s| suit_reading(view.world, s)),
            performance: view.performance(),
        };
        let reason = should_end_eva(&conditions, &ctx.config.eva_limits());
        if let Some(reason) = reason {
            info!("{} ending EVA: {}", ctx.name_of(ctx.person), reason.describe());
        }
        reason
    }

    /// Per-tick accident roll. A hit damages the worn suit.
    pub fn check_for_accident(&self, ctx: &mut TaskContext, time: f64) -> bool {
        let skill = ctx.effective_skill(SkillType::EvaOperations);
        let chance = accident_chance(ctx.config.base_accident_chance, skill);
        let roll = ctx.roll();
        if !accident_triggered(chance, time, roll) {
            return false;
        }
        let Some(suit) = find_suit(ctx.world, ctx.person) else {
            return false;
        };
        let struck = match ctx.world.get::<&mut MalfunctionManager>(suit) {
            Ok(mut m) => m.accident(&mut *ctx.rng).map(|m| m.name.clone()),
            Err(_) => None,
        };
        info!(
            "EVA accident: {} suffered {}",
            ctx.name_of(ctx.person),
            struck.as_deref().unwrap_or("a suit failure")
        );
        true
    }
}

/// The airlock serving `host`: the vehicle's own, or the first airlock
/// building of a settlement.
pub fn find_airlock(world: &World, host: Entity) -> Option<Entity> {
    if world.get::<&Airlock>(host).is_ok() {
        return Some(host);
    }
    let settlement = world.get::<&Settlement>(host).ok()?;
    let airlock = settlement
        .buildings
        .iter()
        .copied()
        .find(|&b| world.get::<&Airlock>(b).is_ok());
    airlock
}

/// Fit, inside, and with a serviceable suit waiting in `host` storage.
pub fn can_exit_airlock(view: &TaskView, airlock: Entity, host: Entity) -> bool {
    if view.world.get::<&Airlock>(airlock).is_err() {
        return false;
    }
    if view.performance() <= view.config.min_exit_performance {
        return false;
    }
    if view.is_outside() {
        return false;
    }
    if find_suit(view.world, view.person).is_some() {
        return true;
    }
    find_good_suit(view.world, host).is_some()
}

/// Outside, with room in the chamber.
pub fn can_enter_airlock(view: &TaskView, airlock: Entity) -> bool {
    if !view.is_outside() {
        return false;
    }
    view.world
        .get::<&Airlock>(airlock)
        .map(|a| !a.is_full())
        .unwrap_or(false)
}

/// Run `f` against an airlock component, `None` if it is gone.
pub(crate) fn with_airlock<R>(world: &World, airlock: Entity, f: impl FnOnce(&mut Airlock) -> R) -> Option<R> {
    match world.get::<&mut Airlock>(airlock) {
        Ok(mut a) => Some(f(&mut a)),
        Err(_) => {
            warn!("airlock {:?} vanished", airlock);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::components::{LocationSituation, Malfunction};
    use crate::surface::FixedSurface;

    #[test]
    fn test_binds_to_settlement_airlock() {
        let mut fx = Fixture::new();
        assert!(EvaOperation::new(&fx.view()).is_err());
        let airlock = fx.add_airlock();
        let eva = EvaOperation::new(&fx.view()).unwrap();
        assert_eq!(eva.airlock, airlock);
        assert_eq!(eva.host, fx.settlement);
    }

    #[test]
    fn test_cannot_exit_without_suit() {
        let mut fx = Fixture::new();
        let airlock = fx.add_airlock();
        assert!(!can_exit_airlock(&fx.view(), airlock, fx.settlement));
        fx.add_suit();
        assert!(can_exit_airlock(&fx.view(), airlock, fx.settlement));
        fx.set_performance(0.05);
        assert!(!can_exit_airlock(&fx.view(), airlock, fx.settlement));
    }

    #[test]
    fn test_exit_when_already_outside_passes_through() {
        let mut fx = Fixture::new();
        fx.add_airlock();
        let mut eva = EvaOperation::new(&fx.view()).unwrap();
        fx.set_situation(LocationSituation::Outside);
        let mut state = TaskState::new("eva");
        assert_eq!(eva.exit_airlock(&mut fx.ctx(), &mut state, 5.0), 0.0);
        assert!(eva.exited);
        assert!(!state.has_sub_task());
    }

    #[test]
    fn test_exit_queues_sub_task_then_gives_up_if_still_inside() {
        let mut fx = Fixture::new();
        fx.add_airlock();
        fx.add_suit();
        let mut eva = EvaOperation::new(&fx.view()).unwrap();
        let mut state = TaskState::new("eva");
        assert_eq!(eva.exit_airlock(&mut fx.ctx(), &mut state, 5.0), 5.0);
        assert!(state.take_sub_task().is_some());
        // the transit ended but the person never left
        eva.exit_airlock(&mut fx.ctx(), &mut state, 5.0);
        assert!(state.is_done());
    }

    #[test]
    fn test_exit_precondition_failure_ends_task() {
        let mut fx = Fixture::new();
        fx.add_airlock();
        let mut eva = EvaOperation::new(&fx.view()).unwrap();
        let mut state = TaskState::new("eva");
        eva.exit_airlock(&mut fx.ctx(), &mut state, 5.0);
        assert!(state.is_done());
        assert!(!state.has_sub_task());
    }

    #[test]
    fn test_should_end_on_suit_states() {
        let mut fx = Fixture::new();
        fx.add_airlock();
        let eva = EvaOperation::new(&fx.view()).unwrap();
        fx.set_situation(LocationSituation::Outside);
        assert_eq!(eva.should_end(&fx.ctx()), Some(EvaAbortReason::NoSuit));

        let suit = fx.wear_suit();
        assert_eq!(eva.should_end(&fx.ctx()), None);

        fx.world
            .get::<&mut MalfunctionManager>(suit)
            .unwrap()
            .malfunctions
            .push(Malfunction::general("Suit Puncture", 5.0));
        assert_eq!(eva.should_end(&fx.ctx()), Some(EvaAbortReason::SuitMalfunction));
    }

    #[test]
    fn test_should_end_at_night() {
        let mut fx = Fixture::new();
        fx.add_airlock();
        let eva = EvaOperation::new(&fx.view()).unwrap();
        fx.set_situation(LocationSituation::Outside);
        fx.wear_suit();
        fx.surface = FixedSurface::night();
        assert_eq!(eva.should_end(&fx.ctx()), Some(EvaAbortReason::Darkness));
        fx.surface.dark_polar = true;
        assert_eq!(eva.should_end(&fx.ctx()), None);
    }

    #[test]
    fn test_novice_eventually_damages_suit() {
        let mut fx = Fixture::new();
        fx.add_airlock();
        let eva = EvaOperation::new(&fx.view()).unwrap();
        fx.set_situation(LocationSituation::Outside);
        let suit = fx.wear_suit();
        // chance 0.004 per millisol at skill 0: 250 millisols is a sure hit
        let hit = eva.check_for_accident(&mut fx.ctx(), 250.0);
        assert!(hit);
        assert!(fx.world.get::<&MalfunctionManager>(suit).unwrap().has_malfunction());
    }
}
