//! Ingress: from the surface back into a settlement or vehicle.
//!
//! Also started as a top-level task when an agent outside has nothing
//! else worth doing.

use hecs::Entity;
use log::{info, warn};

use marsbase_logic::constants::airlock::WALK_TIME;
use marsbase_logic::skills::{NaturalAttribute, SkillType};

use super::eva::{find_airlock, with_airlock};
use super::{Task, TaskBehavior, TaskKind, TaskState};
use crate::components::{find_suit, move_unit, Location, LocationSituation, Vehicle};
use crate::context::{TaskContext, TaskView};
use crate::error::ClaimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    RequestIngress,
    DepressurizeChamber,
    EnterAirlock,
    WalkToChamber,
    PressurizeChamber,
    DoffEvaSuit,
    CleanUp,
    LeaveAirlock,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::RequestIngress => "REQUEST_INGRESS",
            Phase::DepressurizeChamber => "DEPRESSURIZE_CHAMBER",
            Phase::EnterAirlock => "ENTER_AIRLOCK",
            Phase::WalkToChamber => "WALK_TO_CHAMBER",
            Phase::PressurizeChamber => "PRESSURIZE_CHAMBER",
            Phase::DoffEvaSuit => "DOFF_EVA_SUIT",
            Phase::CleanUp => "CLEAN_UP",
            Phase::LeaveAirlock => "LEAVE_AIRLOCK",
        }
    }
}

pub struct EnterAirlock {
    phase: Phase,
    airlock: Entity,
    host: Entity,
    waited: f64,
    phase_time: f64,
}

impl EnterAirlock {
    pub fn create(view: &TaskView, airlock: Entity, host: Entity) -> Task {
        let description = format!(
            "Entering via {}",
            crate::context::entity_name(view.world, airlock)
        );
        Task::new(
            TaskKind::EnterAirlock,
            TaskState::new(description)
                .with_stress(0.5)
                .with_skills(&[SkillType::EvaOperations])
                .with_experience_attribute(NaturalAttribute::Agility),
            Self {
                phase: Phase::RequestIngress,
                airlock,
                host,
                waited: 0.0,
                phase_time: 0.0,
            },
        )
    }

    /// Top-level factory for an agent stranded outside.
    pub fn fallback(ctx: &mut TaskContext) -> Result<Task, ClaimError> {
        let view = ctx.view();
        if !view.is_outside() {
            return Err(ClaimError::Unavailable("already inside"));
        }
        let host = view
            .location()?
            .host()
            .ok_or(ClaimError::Unavailable("nowhere to return to"))?;
        let airlock = find_airlock(view.world, host).ok_or(ClaimError::Unavailable("no airlock"))?;
        Ok(Self::create(&view, airlock, host))
    }

    fn wait(&mut self, ctx: &TaskContext, state: &mut TaskState, time: f64) -> f64 {
        self.waited += time;
        if self.waited > ctx.config.airlock_wait_limit {
            warn!(
                "{} gave up waiting outside {} during {}",
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

    fn request_ingress(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        let reserved = with_airlock(ctx.world, self.airlock, |a| {
            a.add_reservation(person).map(|_| a.join_outer_queue(person))
        });
        match reserved {
            Some(Ok(())) => {
                self.phase = Phase::DepressurizeChamber;
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

    fn depressurize_chamber(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        let ready = with_airlock(ctx.world, self.airlock, |a| {
            if a.is_depressurized() && !a.is_cycling() {
                return true;
            }
            if a.is_pressurized() && !a.is_cycling() && a.is_empty() && a.set_depressurizing() {
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
        match with_airlock(ctx.world, self.airlock, |a| a.enter(person, false)) {
            Some(Ok(())) => {
                self.phase = Phase::WalkToChamber;
                time
            }
            Some(Err(ClaimError::AirlockDoorLocked)) => {
                self.phase = Phase::DepressurizeChamber;
                time
            }
            Some(Err(_)) => self.wait(ctx, state, time),
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
            if a.is_depressurized() && !a.is_cycling() && a.set_pressurizing() {
                a.operator = Some(person);
            }
            false
        });
        match ready {
            Some(true) => {
                self.phase = Phase::DoffEvaSuit;
                time
            }
            Some(false) => self.wait(ctx, state, time),
            None => {
                state.end_task();
                time
            }
        }
    }

    fn doff_eva_suit(&mut self, ctx: &mut TaskContext, time: f64) -> f64 {
        let left = self.timed(time, ctx.config.doff_suit_time, Phase::CleanUp);
        if self.phase == Phase::CleanUp {
            let person = ctx.person;
            if let Some(suit) = find_suit(ctx.world, person) {
                if let Err(e) = move_unit(ctx.world, suit, person, self.host) {
                    warn!("{} could not stow suit: {}", ctx.name_of(person), e);
                }
            }
        }
        left
    }

    fn leave_airlock(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        let person = ctx.person;
        match with_airlock(ctx.world, self.airlock, |a| a.exit(person, false)) {
            Some(Ok(())) => {
                let in_vehicle = ctx.world.get::<&Vehicle>(self.host).is_ok();
                if let Ok(mut location) = ctx.world.get::<&mut Location>(person) {
                    if in_vehicle {
                        location.situation = LocationSituation::InVehicle;
                        location.vehicle = Some(self.host);
                    } else {
                        location.situation = LocationSituation::InSettlement;
                        location.settlement = Some(self.host);
                        location.vehicle = None;
                    }
                }
                info!("{} is back inside {}", ctx.name_of(person), ctx.name_of(self.host));
                state.end_task();
                time
            }
            Some(Err(_)) => {
                self.phase = Phase::PressurizeChamber;
                time
            }
            None => {
                state.end_task();
                time
            }
        }
    }
}

impl TaskBehavior for EnterAirlock {
    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    fn perform_phase(&mut self, ctx: &mut TaskContext, state: &mut TaskState, time: f64) -> f64 {
        match self.phase {
            Phase::RequestIngress => self.request_ingress(ctx, state, time),
            Phase::DepressurizeChamber => self.depressurize_chamber(ctx, state, time),
            Phase::EnterAirlock => self.enter_airlock(ctx, state, time),
            Phase::WalkToChamber => self.timed(time, WALK_TIME, Phase::PressurizeChamber),
            Phase::PressurizeChamber => self.pressurize_chamber(ctx, state, time),
            Phase::DoffEvaSuit => self.doff_eva_suit(ctx, time),
            Phase::CleanUp => self.timed(time, ctx.config.clean_up_time, Phase::LeaveAirlock),
            Phase::LeaveAirlock => self.leave_airlock(ctx, state, time),
        }
    }

    fn clear_down(&mut self, ctx: &mut TaskContext) {
        let person = ctx.person;
        with_airlock(ctx.world, self.airlock, |a| a.remove(person));
    }
}
