//! Ground vehicles.
//!
//! A vehicle entity carries `Vehicle`, `Name`, `Inventory`, a
//! `MalfunctionManager`, an `Airlock` and optionally a `LoadingManifest`.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::{Inventory, Resource};

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub name: String,
    /// Settlement the vehicle is parked at.
    pub settlement: Entity,
    /// Garage building holding the vehicle, if any.
    pub garage: Option<Entity>,
}

/// Cargo a vehicle should carry before its next trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadingManifest {
    pub resources: Vec<(Resource, f64)>,
}

impl LoadingManifest {
    /// Mass still to load that both the source can give and the vehicle can take.
    pub fn loadable_mass(&self, vehicle: &Inventory, source: &Inventory) -> f64 {
        self.resources
            .iter()
            .map(|&(resource, wanted)| {
                self.shortfall(resource, wanted, vehicle)
                    .min(source.amount(resource))
                    .min(vehicle.remaining_capacity(resource))
            })
            .sum()
    }

    /// First resource the vehicle is still short of and the source has.
    pub fn next_item(&self, vehicle: &Inventory, source: &Inventory) -> Option<(Resource, f64)> {
        self.resources.iter().find_map(|&(resource, wanted)| {
            let amount = self
                .shortfall(resource, wanted, vehicle)
                .min(source.amount(resource))
                .min(vehicle.remaining_capacity(resource));
            (amount > 0.0).then_some((resource, amount))
        })
    }

    pub fn is_loaded(&self, vehicle: &Inventory) -> bool {
        self.resources
            .iter()
            .all(|&(resource, wanted)| self.shortfall(resource, wanted, vehicle) <= 0.0)
    }

    fn shortfall(&self, resource: Resource, wanted: f64, vehicle: &Inventory) -> f64 {
        (wanted - vehicle.amount(resource)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loadable_mass_limited_by_source_and_room() {
        let manifest = LoadingManifest {
            resources: vec![(Resource::Oxygen, 50.0), (Resource::Food, 20.0)],
        };
        let rover = Inventory::new()
            .with_capacity(Resource::Oxygen, 30.0)
            .with_capacity(Resource::Food, 100.0);
        let base = Inventory::new()
            .with_amount(Resource::Oxygen, 500.0)
            .with_amount(Resource::Food, 5.0);
        assert_eq!(manifest.loadable_mass(&rover, &base), 35.0);
        assert_eq!(manifest.next_item(&rover, &base), Some((Resource::Oxygen, 30.0)));
        assert!(!manifest.is_loaded(&rover));
    }
}
