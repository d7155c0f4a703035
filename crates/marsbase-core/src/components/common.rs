//! Components shared by several entity kinds.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::surface::Coordinates;

/// Display name of any entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a person currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationSituation {
    InSettlement,
    InVehicle,
    Outside,
}

impl LocationSituation {
    pub fn name(self) -> &'static str {
        match self {
            LocationSituation::InSettlement => "in settlement",
            LocationSituation::InVehicle => "in vehicle",
            LocationSituation::Outside => "outside",
        }
    }
}

/// Position of a person.
///
/// `settlement` and `vehicle` name the host the person is in, or the one
/// they stepped out of while outside. Re-entry goes back to that host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub situation: LocationSituation,
    pub settlement: Option<Entity>,
    pub vehicle: Option<Entity>,
    pub coordinates: Coordinates,
}

impl Location {
    pub fn in_settlement(settlement: Entity, coordinates: Coordinates) -> Self {
        Self {
            situation: LocationSituation::InSettlement,
            settlement: Some(settlement),
            vehicle: None,
            coordinates,
        }
    }

    pub fn in_vehicle(vehicle: Entity, home: Option<Entity>, coordinates: Coordinates) -> Self {
        Self {
            situation: LocationSituation::InVehicle,
            settlement: home,
            vehicle: Some(vehicle),
            coordinates,
        }
    }

    pub fn is_outside(&self) -> bool {
        self.situation == LocationSituation::Outside
    }

    pub fn is_inside(&self) -> bool {
        !self.is_outside()
    }

    /// Settlement the person is inside right now.
    pub fn current_settlement(&self) -> Option<Entity> {
        match self.situation {
            LocationSituation::InSettlement => self.settlement,
            _ => None,
        }
    }

    /// Vehicle the person is inside right now.
    pub fn current_vehicle(&self) -> Option<Entity> {
        match self.situation {
            LocationSituation::InVehicle => self.vehicle,
            _ => None,
        }
    }

    /// The settlement or vehicle whose airlock and inventory serve this person.
    pub fn host(&self) -> Option<Entity> {
        self.vehicle.or(self.settlement)
    }
}
