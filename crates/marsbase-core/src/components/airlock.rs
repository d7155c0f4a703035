//! Airlock state machine.
//!
//! An airlock rests in one of two steady states: pressurized (inner door
//! unlocked) or depressurized (outer door unlocked). A cycle request locks
//! both doors and, after `cycle_time` millisols of activation, settles in
//! the opposite steady state. The engine advances every airlock by the
//! tick quantum; tasks only request cycles and move people through.

use hecs::Entity;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use marsbase_logic::constants::airlock::{CYCLE_TIME, MAX_RESERVED};

use crate::error::ClaimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirlockState {
    Pressurized,
    Depressurizing,
    Depressurized,
    Pressurizing,
}

impl AirlockState {
    pub fn name(self) -> &'static str {
        match self {
            AirlockState::Pressurized => "pressurized",
            AirlockState::Depressurizing => "depressurizing",
            AirlockState::Depressurized => "depressurized",
            AirlockState::Pressurizing => "pressurizing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Airlock {
    pub state: AirlockState,
    pub inner_door_locked: bool,
    pub outer_door_locked: bool,
    /// A cycle is in progress.
    pub activated: bool,
    pub remaining_cycle_time: f64,
    pub cycle_time: f64,
    pub capacity: usize,
    pub max_reservations: usize,
    occupants: Vec<Entity>,
    awaiting_inner: VecDeque<Entity>,
    awaiting_outer: VecDeque<Entity>,
    reserved: Vec<Entity>,
    pub operator: Option<Entity>,
}

impl Airlock {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: AirlockState::Pressurized,
            inner_door_locked: false,
            outer_door_locked: true,
            activated: false,
            remaining_cycle_time: 0.0,
            cycle_time: CYCLE_TIME,
            capacity: capacity.max(1),
            max_reservations: MAX_RESERVED,
            occupants: Vec::new(),
            awaiting_inner: VecDeque::new(),
            awaiting_outer: VecDeque::new(),
            reserved: Vec::new(),
            operator: None,
        }
    }

    pub fn with_cycle_time(mut self, cycle_time: f64) -> Self {
        self.cycle_time = cycle_time;
        self
    }

    pub fn with_max_reservations(mut self, max: usize) -> Self {
        self.max_reservations = max;
        self
    }

    pub fn is_pressurized(&self) -> bool {
        self.state == AirlockState::Pressurized
    }

    pub fn is_depressurized(&self) -> bool {
        self.state == AirlockState::Depressurized
    }

    pub fn is_cycling(&self) -> bool {
        self.activated
    }

    pub fn occupants(&self) -> &[Entity] {
        &self.occupants
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity
    }

    pub fn is_occupant(&self, person: Entity) -> bool {
        self.occupants.contains(&person)
    }

    /// Begin depressurizing. Only valid from the pressurized steady state.
    pub fn set_depressurizing(&mut self) -> bool {
        if self.state != AirlockState::Pressurized || self.activated {
            return false;
        }
        self.state = AirlockState::Depressurizing;
        self.begin_cycle();
        true
    }

    /// Begin pressurizing. Only valid from the depressurized steady state.
    pub fn set_pressurizing(&mut self) -> bool {
        if self.state != AirlockState::Depressurized || self.activated {
            return false;
        }
        self.state = AirlockState::Pressurizing;
        self.begin_cycle();
        true
    }

    fn begin_cycle(&mut self) {
        self.inner_door_locked = true;
        self.outer_door_locked = true;
        self.activated = true;
        self.remaining_cycle_time = self.cycle_time;
    }

    /// Advance an active cycle. Returns true when it settled this call.
    pub fn add_time(&mut self, time: f64) -> bool {
        if !self.activated || time <= 0.0 {
            return false;
        }
        let consumed = self.remaining_cycle_time.min(time);
        self.remaining_cycle_time -= consumed;
        if self.remaining_cycle_time <= 0.0 {
            self.remaining_cycle_time = 0.0;
            self.go_to_next_steady_state();
            return true;
        }
        false
    }

    fn go_to_next_steady_state(&mut self) {
        match self.state {
            AirlockState::Depressurizing => {
                self.state = AirlockState::Depressurized;
                self.inner_door_locked = true;
                self.outer_door_locked = false;
            }
            AirlockState::Pressurizing => {
                self.state = AirlockState::Pressurized;
                self.inner_door_locked = false;
                self.outer_door_locked = true;
            }
            _ => {}
        }
        self.activated = false;
        self.operator = None;
    }

    /// Reserve a place in the queue for this airlock.
    pub fn add_reservation(&mut self, person: Entity) -> Result<(), ClaimError> {
        if self.reserved.contains(&person) {
            return Ok(());
        }
        if self.reserved.len() >= self.max_reservations {
            return Err(ClaimError::ReservationsFull);
        }
        self.reserved.push(person);
        Ok(())
    }

    pub fn has_reservation(&self, person: Entity) -> bool {
        self.reserved.contains(&person)
    }

    pub fn join_inner_queue(&mut self, person: Entity) {
        if !self.awaiting_inner.contains(&person) {
            self.awaiting_inner.push_back(person);
        }
    }

    pub fn join_outer_queue(&mut self, person: Entity) {
        if !self.awaiting_outer.contains(&person) {
            self.awaiting_outer.push_back(person);
        }
    }

    pub fn awaiting_inner(&self) -> usize {
        self.awaiting_inner.len()
    }

    pub fn awaiting_outer(&self) -> usize {
        self.awaiting_outer.len()
    }

    /// Step into the chamber through the door matching the direction of travel.
    pub fn enter(&mut self, person: Entity, egress: bool) -> Result<(), ClaimError> {
        if self.is_occupant(person) {
            return Ok(());
        }
        let door_locked = if egress {
            self.inner_door_locked
        } else {
            self.outer_door_locked
        };
        if door_locked {
            return Err(ClaimError::AirlockDoorLocked);
        }
        if self.is_full() {
            return Err(ClaimError::AirlockFull);
        }
        self.occupants.push(person);
        if egress {
            self.awaiting_inner.retain(|&p| p != person);
        } else {
            self.awaiting_outer.retain(|&p| p != person);
        }
        Ok(())
    }

    /// Leave the chamber through the far door.
    pub fn exit(&mut self, person: Entity, egress: bool) -> Result<(), ClaimError> {
        let door_locked = if egress {
            self.outer_door_locked
        } else {
            self.inner_door_locked
        };
        if door_locked {
            return Err(ClaimError::AirlockDoorLocked);
        }
        self.remove(person);
        Ok(())
    }

    /// Forget this person everywhere: chamber, queues, reservations, operator seat.
    pub fn remove(&mut self, person: Entity) {
        self.occupants.retain(|&p| p != person);
        self.awaiting_inner.retain(|&p| p != person);
        self.awaiting_outer.retain(|&p| p != person);
        self.reserved.retain(|&p| p != person);
        if self.operator == Some(person) {
            self.operator = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    fn people(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn(())).collect()
    }

    #[test]
    fn test_initial_state() {
        let airlock = Airlock::new(2);
        assert!(airlock.is_pressurized());
        assert!(!airlock.inner_door_locked);
        assert!(airlock.outer_door_locked);
        assert!(!airlock.is_cycling());
    }

    #[test]
    fn test_full_cycle_flips_doors() {
        let mut airlock = Airlock::new(2);
        assert!(!airlock.set_pressurizing(), "already pressurized");
        assert!(airlock.set_depressurizing());
        assert!(airlock.inner_door_locked && airlock.outer_door_locked);
        assert!(!airlock.add_time(4.0));
        assert!(airlock.add_time(6.0));
        assert!(airlock.is_depressurized());
        assert!(airlock.inner_door_locked);
        assert!(!airlock.outer_door_locked);
        assert!(!airlock.is_cycling());

        assert!(airlock.set_pressurizing());
        assert!(airlock.add_time(25.0));
        assert!(airlock.is_pressurized());
        assert!(!airlock.inner_door_locked);
    }

    #[test]
    fn test_enter_respects_doors_and_capacity() {
        let p = people(3);
        let mut airlock = Airlock::new(2);
        // ingress blocked: outer door locked while pressurized
        assert!(matches!(
            airlock.enter(p[0], false),
            Err(ClaimError::AirlockDoorLocked)
        ));
        assert!(airlock.enter(p[0], true).is_ok());
        assert!(airlock.enter(p[1], true).is_ok());
        assert!(matches!(airlock.enter(p[2], true), Err(ClaimError::AirlockFull)));
        // outer door still locked, nobody leaves outward
        assert!(airlock.exit(p[0], true).is_err());
    }

    #[test]
    fn test_reservation_limit() {
        let p = people(5);
        let mut airlock = Airlock::new(1);
        for &person in &p[..4] {
            assert!(airlock.add_reservation(person).is_ok());
        }
        assert!(matches!(
            airlock.add_reservation(p[4]),
            Err(ClaimError::ReservationsFull)
        ));
        airlock.remove(p[0]);
        assert!(airlock.add_reservation(p[4]).is_ok());
    }

    #[test]
    fn test_remove_clears_everything() {
        let p = people(1);
        let mut airlock = Airlock::new(1);
        airlock.join_inner_queue(p[0]);
        airlock.add_reservation(p[0]).unwrap();
        airlock.enter(p[0], true).unwrap();
        airlock.operator = Some(p[0]);
        airlock.remove(p[0]);
        assert!(airlock.is_empty());
        assert_eq!(airlock.awaiting_inner(), 0);
        assert!(!airlock.has_reservation(p[0]));
        assert_eq!(airlock.operator, None);
    }
}
