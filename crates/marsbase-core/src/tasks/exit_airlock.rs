//! Egress: from inside a settlement or vehicle to the surface, suited up.

use hecs::Entity;
use log::{debug, info, warn};

use marsbase_logic::constants::airlock::WALK_TIME;
use marsbase_logic::skills::{NaturalAttribute, SkillType};

use super::eva::with_airlock;
use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{find_good_suit, find_suit, move_unit, transfer, Inventory, Location, LocationSituation, Resource};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    RequestEgress,
    PressurizeChamber,
    EnterAirlock,
    WalkToChamber,
    DonEvaSuit,
    Prebreathe,
    DepressurizeChamber,
    LeaveAirlock,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::RequestEgress => "REQUEST_EGRESS",
            Phase::PressurizeChamber => "PRESSURIZE_CHAMBER",
            Phase::EnterAirlock => "ENTER_AIRLOCK",
            Phase::WalkToChamber => "WALK_TO_CHAMBER",
            Phase::DonEvaSuit => "DON_EVA_SUIT",
            Phase::Prebreathe => "PREBREATHE",
            Phase::DepressurizeChamber => "DEPRESSURIZE_CHAMBER",
            Phase::LeaveAirlock => "LEAVE_AIRLOCK",
        }
    }
}

pub struct ExitAirlock {
    phase: Phase,
    airlock: Entity,
    host: Entity,
    /// Total time spent waiting on the airlock.
    waited: f64,
    /// Progress through the current timed phase.
    phase_time: f64,
    suit: Option<Entity>,
}

impl ExitAirlock {
    pub fn create(view: &TaskView, airlock: Entity, host: Entity) -> Task {
        let description = format!(
            "Exiting via {}",
            crate::context::entity_name(view.world, airlock)
        );
        Task::new(
            TaskKind::ExitAirlock,
            TaskState::new(description)
                .with_stress(0.5)
                .with_skills(&[SkillType::EvaOperations])
                .with_experience_attribute(NaturalAttribute::Agility),
            Self {
                phase: Phase::RequestEgress,
                airlock,
                host,
                waited: 0.0,
                phase_time: 0.0,
                suit: None,
            },
        )
    }

    fn wait(&mut self, ctx: &TaskContext, state: &mut TaskState, time: f64) -> f64 {
        self.waited += time;
        if self.waited > ctx.config.airlock_wait_limit {
            warn!(
                "{} gave up waiting at {} during {}",
                ctx.name_of(ctx.person),
                ctx.name_of(self.airlock),
                self.phase.name()
            );
            state.end_task();
        }
        time
    }

    fn timed(&mut self, time: f64, needed: f64, next: Phase) -> f64 {
        let used = (needed - self.phase_time).max(0.0).min(time);
        self.phase_time += used;
        if self.phase_time >= needed {
            self.phase_time = 0.0;
            self.phase = next;
        }
        time - used
    }

    fn request_egress(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        let reserved = with_airlock(ctx.world, self.airlock, |a| {
            a.add_reservation(person).map(|_| a.join_inner_queue(person))
        });
        match reserved {
            Some(Ok(())) => {
                self.phase = Phase::PressurizeChamber;
                time
            }
            Some(Err(ClaimError::ReservationsFull)) => self.wait(ctx, state, time),
            Some(Err(e)) => {
                warn!("{} could not reserve airlock: {}", ctx.name_of(person), e);
                state.end_task();
                time
            }
            None => {
                state.end_task();
                time
            }
        }
    }

    fn pressurize_chamber(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        let ready = with_airlock(ctx.world, self.airlock, |a| {
            if a.is_pressurized() && !a.is_cycling() {
                return true;
            }
            if a.is_depressurized() && !a.is_cycling() && a.is_empty() && a.set_pressurizing() {
                a.operator = Some(person);
            }
            false
        });
        match ready {
            Some(true) => {
                self.phase = Phase::EnterAirlock;
                time
            }
            Some(false) => self.wait(ctx, state, time),
            None => {
                state.end_task();
                time
            }
        }
    }

    fn enter_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        match with_airlock(ctx.world, self.airlock, |a| a.enter(person, true)) {
            Some(Ok(())) => {
                self.phase = Phase::WalkToChamber;
                time
            }
            Some(Err(ClaimError::AirlockDoorLocked)) => {
                self.phase = Phase::PressurizeChamber;
                time
            }
            Some(Err(_)) => self.wait(ctx, state, time),
            None => {
                state.end_task();
                time
            }
        }
    }

    fn don_eva_suit(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        if self.suit.is_none() {
            let person = ctx.person;
            let claimed = match find_suit(ctx.world, person) {
                Some(suit) => Ok(suit),
                None => self.claim_suit(ctx),
            };
            match claimed {
                Ok(suit) => {
                    self.suit = Some(suit);
                    self.top_up(ctx, suit);
                }
                Err(e) => {
                    info!("{} could not don a suit: {}", ctx.name_of(person), e);
                    state.end_task();
                    return time;
                }
            }
        }
        self.timed(time, ctx.config.don_suit_time, Phase::Prebreathe)
    }

    fn claim_suit(&self, ctx: &mut TaskContext) -> Result<Entity, ClaimError> {
        let suit = find_good_suit(ctx.world, self.host).ok_or(ClaimError::NoUnitAvailable("EVA suit"))?;
        move_unit(ctx.world, suit, self.host, ctx.person)?;
        Ok(suit)
    }

    fn top_up(&self, ctx: &mut TaskContext, suit: Entity) {
        for resource in [Resource::Oxygen, Resource::Water] {
            let room = ctx
                .world
                .get::<&Inventory>(suit)
                .map(|inv| inv.remaining_capacity(resource))
                .unwrap_or(0.0);
            if room <= 0.0 {
                continue;
            }
            if let Err(e) = transfer(ctx.world, self.host, suit, resource, room) {
                warn!("Suit top-up of {} failed: {}", resource.name(), e);
            }
        }
    }

    fn depressurize_chamber(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        let ready = with_airlock(ctx.world, self.airlock, |a| {
            if a.is_depressurized() && !a.is_cycling() {
                return true;
            }
            if a.is_pressurized() && !a.is_cycling() && a.set_depressurizing() {
                a.operator = Some(person);
            }
            false
        });
        match ready {
            Some(true) => {
                self.phase = Phase::LeaveAirlock;
                time
            }
            Some(false) => self.wait(ctx, state, time),
            None => {
                state.end_task();
                time
            }
        }
    }

    fn leave_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        match with_airlock(ctx.world, self.airlock, |a| a.exit(person, true)) {
            Some(Ok(())) => {
                if let Ok(mut location) = ctx.world.get::<&mut Location>(person) {
                    location.situation = LocationSituation::Outside;
                }
                info!("{} stepped outside", ctx.name_of(person));
                state.end_task();
                time
            }
            Some(Err(_)) => {
                self.phase = Phase::DepressurizeChamber;
                time
            }
            None => {
                state.end_task();
                time
            }
        }
    }
}

impl TaskBehavior for ExitAirlock {
    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        match self.phase {
            Phase::RequestEgress => self.request_egress(ctx, state, time),
            Phase::PressurizeChamber => self.pressurize_chamber(ctx, state, time),
            Phase::EnterAirlock => self.enter_airlock(ctx, state, time),
            Phase::WalkToChamber => self.timed(time, WALK_TIME, Phase::DonEvaSuit),
            Phase::DonEvaSuit => self.don_eva_suit(ctx, state, time),
            Phase::Prebreathe => self.timed(time, ctx.config.prebreathe_time, Phase::DepressurizeChamber),
            Phase::DepressurizeChamber => self.depressurize_chamber(ctx, state, time),
            Phase::LeaveAirlock => self.leave_airlock(ctx, state, time),
        }
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        let person = ctx.person;
        with_airlock(ctx.world, self.airlock, |a| a.remove(person));
        let outside = ctx.view().is_outside();
        if outside {
            return;
        }
        // Aborted before leaving: hang the suit back up.
        if let Some(suit) = self.suit {
            match move_unit(ctx.world, suit, person, self.host) {
                Ok(()) => debug!("{} returned suit after aborted egress", ctx.name_of(person)),
                Err(e) => warn!("Could not return suit: {}", e),
            }
        }
    }
}
