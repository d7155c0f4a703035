//! Errors raised by claims on shared colony resources.
//!
//! Every check-then-mutate operation on something several agents can
//! touch in the same tick (inventories, airlocks, facility slots) returns
//! a `Result` so that losing a race is an explicit signal. Task code turns
//! these into `end_task()` plus a log line; they never escape a tick.

use hecs::Entity;

use crate::components::Resource;

#[derive(Debug)]
pub enum ClaimError {
    /// Entity despawned or lacks the component the claim needs.
    World(hecs::ComponentError),
    InsufficientResource {
        resource: Resource,
        requested: f64,
        available: f64,
    },
    InsufficientCapacity {
        resource: Resource,
        requested: f64,
        remaining: f64,
    },
    /// A unit (suit, container) is no longer where it was expected.
    UnitMissing(Entity),
    /// No unit of the wanted kind is available.
    NoUnitAvailable(&'static str),
    AirlockFull,
    AirlockDoorLocked,
    ReservationsFull,
    /// A garage, lab, gym or bed has no free slot.
    NoVacancy(&'static str),
    /// Something is already held by another agent.
    AlreadyClaimed(Entity),
    /// A precondition the task depends on does not hold.
    Unavailable(&'static str),
}

impl std::fmt::Display for ClaimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimError::World(e) => write!(f, "World error: {}", e),
            ClaimError::InsufficientResource {
                resource,
                requested,
                available,
            } => write!(
                f,
                "Insufficient {}: requested {:.3} kg, {:.3} kg available",
                resource.name(),
                requested,
                available
            ),
            ClaimError::InsufficientCapacity {
                resource,
                requested,
                remaining,
            } => write!(
                f,
                "No room for {}: requested {:.3} kg, {:.3} kg capacity left",
                resource.name(),
                requested,
                remaining
            ),
            ClaimError::UnitMissing(unit) => write!(f, "Unit {:?} was taken", unit),
            ClaimError::NoUnitAvailable(kind) => write!(f, "No {} available", kind),
            ClaimError::AirlockFull => write!(f, "Airlock chamber is full"),
            ClaimError::AirlockDoorLocked => write!(f, "Airlock door is locked"),
            ClaimError::ReservationsFull => write!(f, "Airlock reservations are full"),
            ClaimError::NoVacancy(what) => write!(f, "No free {} slot", what),
            ClaimError::AlreadyClaimed(by) => write!(f, "Already claimed by {:?}", by),
            ClaimError::Unavailable(what) => write!(f, "Unavailable: {}", what),
        }
    }
}

impl std::error::Error for ClaimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClaimError::World(e) => Some(e),
            _ => None,
        }
    }
}

impl From<hecs::ComponentError> for ClaimError {
    fn from(e: hecs::ComponentError) -> Self {
        ClaimError::World(e)
    }
}

impl From<hecs::NoSuchEntity> for ClaimError {
    fn from(_: hecs::NoSuchEntity) -> Self {
        ClaimError::World(hecs::ComponentError::NoSuchEntity)
    }
}
