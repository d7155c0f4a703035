//! Resources and inventories.
//!
//! An `Inventory` component sits on every settlement, vehicle, suit,
//! container and person. Amounts are in kg. Units (suits, containers) are
//! entities stored by id. All mutation goes through claim methods that
//! either succeed completely or report why they could not.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ClaimError;

/// Tolerance for floating-point capacity checks.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    Oxygen,
    Water,
    Food,
    Ice,
    Regolith,
    Methane,
    Hydrogen,
    CarbonDioxide,
    Polymers,
    Bricks,
    SpareParts,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Oxygen,
        Resource::Water,
        Resource::Food,
        Resource::Ice,
        Resource::Regolith,
        Resource::Methane,
        Resource::Hydrogen,
        Resource::CarbonDioxide,
        Resource::Polymers,
        Resource::Bricks,
        Resource::SpareParts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Oxygen => "oxygen",
            Resource::Water => "water",
            Resource::Food => "food",
            Resource::Ice => "ice",
            Resource::Regolith => "regolith",
            Resource::Methane => "methane",
            Resource::Hydrogen => "hydrogen",
            Resource::CarbonDioxide => "carbon dioxide",
            Resource::Polymers => "polymers",
            Resource::Bricks => "bricks",
            Resource::SpareParts => "spare parts",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    amounts: BTreeMap<Resource, f64>,
    capacities: BTreeMap<Resource, f64>,
    units: Vec<Entity>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, resource: Resource, capacity: f64) -> Self {
        self.capacities.insert(resource, capacity.max(0.0));
        self
    }

    /// Seed an amount, growing capacity if needed.
    pub fn with_amount(mut self, resource: Resource, amount: f64) -> Self {
        let amount = amount.max(0.0);
        let cap = self.capacity(resource).max(amount);
        self.capacities.insert(resource, cap);
        self.amounts.insert(resource, amount);
        self
    }

    pub fn amount(&self, resource: Resource) -> f64 {
        self.amounts.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn capacity(&self, resource: Resource) -> f64 {
        self.capacities.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn remaining_capacity(&self, resource: Resource) -> f64 {
        (self.capacity(resource) - self.amount(resource)).max(0.0)
    }

    pub fn total_mass(&self) -> f64 {
        self.amounts.values().sum()
    }

    /// Store the whole amount or nothing.
    pub fn store(&mut self, resource: Resource, amount: f64) -> Result<(), ClaimError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Ok(());
        }
        let remaining = self.remaining_capacity(resource);
        if amount > remaining + EPSILON {
            return Err(ClaimError::InsufficientCapacity {
                resource,
                requested: amount,
                remaining,
            });
        }
        let cap = self.capacity(resource);
        let slot = self.amounts.entry(resource).or_insert(0.0);
        *slot = (*slot + amount).min(cap);
        Ok(())
    }

    /// Store as much as fits, returning the amount stored.
    pub fn store_up_to(&mut self, resource: Resource, amount: f64) -> f64 {
        let storing = amount.max(0.0).min(self.remaining_capacity(resource));
        if storing > 0.0 {
            *self.amounts.entry(resource).or_insert(0.0) += storing;
        }
        storing
    }

    /// Claim exactly `amount`, or fail without touching the inventory.
    pub fn retrieve(&mut self, resource: Resource, amount: f64) -> Result<f64, ClaimError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Ok(0.0);
        }
        let available = self.amount(resource);
        if amount > available + EPSILON {
            return Err(ClaimError::InsufficientResource {
                resource,
                requested: amount,
                available,
            });
        }
        let taken = amount.min(available);
        self.amounts.insert(resource, (available - taken).max(0.0));
        Ok(taken)
    }

    /// Claim whatever is left up to `amount`.
    pub fn retrieve_up_to(&mut self, resource: Resource, amount: f64) -> f64 {
        let available = self.amount(resource);
        let taken = amount.max(0.0).min(available);
        if taken > 0.0 {
            self.amounts.insert(resource, available - taken);
        }
        taken
    }

    pub fn units(&self) -> &[Entity] {
        &self.units
    }

    pub fn has_unit(&self, unit: Entity) -> bool {
        self.units.contains(&unit)
    }

    pub fn add_unit(&mut self, unit: Entity) {
        if !self.units.contains(&unit) {
            self.units.push(unit);
        }
    }

    pub fn take_unit(&mut self, unit: Entity) -> Result<(), ClaimError> {
        match self.units.iter().position(|&u| u == unit) {
            Some(idx) => {
                self.units.remove(idx);
                Ok(())
            }
            None => Err(ClaimError::UnitMissing(unit)),
        }
    }
}

/// Move up to `amount` of `resource` between two inventories.
///
/// The movable amount is settled before anything changes hands: the
/// smaller of the request, what the source holds and what the destination
/// can take. If the final store fails anyway, the claimed mass goes back
/// to the source, so a partial transfer never loses mass.
pub fn transfer(
    world: &World,
    from: Entity,
    to: Entity,
    resource: Resource,
    amount: f64,
) -> Result<f64, ClaimError> {
    let available = world.get::<&Inventory>(from)?.amount(resource);
    let room = world.get::<&Inventory>(to)?.remaining_capacity(resource);
    let moving = amount.max(0.0).min(available).min(room);
    if moving <= 0.0 {
        if amount <= 0.0 {
            return Ok(0.0);
        }
        if available <= 0.0 {
            return Err(ClaimError::InsufficientResource {
                resource,
                requested: amount,
                available,
            });
        }
        return Err(ClaimError::InsufficientCapacity {
            resource,
            requested: amount,
            remaining: room,
        });
    }

    let claimed = world.get::<&mut Inventory>(from)?.retrieve(resource, moving)?;
    let stored = match world.get::<&mut Inventory>(to) {
        Ok(mut dest) => dest.store(resource, claimed),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = stored {
        if let Ok(mut source) = world.get::<&mut Inventory>(from) {
            source.store_up_to(resource, claimed);
        }
        return Err(e);
    }
    Ok(claimed)
}

/// Move a unit from one inventory to another.
pub fn move_unit(world: &World, unit: Entity, from: Entity, to: Entity) -> Result<(), ClaimError> {
    world.get::<&mut Inventory>(from)?.take_unit(unit)?;
    match world.get::<&mut Inventory>(to) {
        Ok(mut dest) => {
            dest.add_unit(unit);
            Ok(())
        }
        Err(e) => {
            if let Ok(mut source) = world.get::<&mut Inventory>(from) {
                source.add_unit(unit);
            }
            Err(e.into())
        }
    }
}
