//! Portable equipment: EVA suits and collection containers.
//!
//! Both are entities held as units in some `Inventory`.

use hecs::{Entity, World};

use marsbase_logic::constants::eva::{SUIT_OXYGEN_CAPACITY, SUIT_WATER_CAPACITY};
use marsbase_logic::eva::SuitReading;

use super::{Inventory, MalfunctionManager, MalfunctionScope, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvaSuit;

impl EvaSuit {
    /// Empty suit inventory with the standard tank sizes.
    pub fn inventory() -> Inventory {
        Inventory::new()
            .with_capacity(Resource::Oxygen, SUIT_OXYGEN_CAPACITY)
            .with_capacity(Resource::Water, SUIT_WATER_CAPACITY)
    }

    pub fn malfunctions(maintenance_work_time: f64) -> MalfunctionManager {
        MalfunctionManager::new(MalfunctionScope::Suit, maintenance_work_time)
    }
}

/// A bag or barrel for surface collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub resource: Resource,
}

impl Container {
    pub fn inventory(resource: Resource, capacity: f64) -> Inventory {
        Inventory::new().with_capacity(resource, capacity)
    }
}

/// Read a suit's life-support state for the safety interrupt.
pub fn suit_reading(world: &World, suit: Entity) -> Option<SuitReading> {
    if world.get::<&EvaSuit>(suit).is_err() {
        return None;
    }
    let inventory = world.get::<&Inventory>(suit).ok()?;
    let malfunction = world
        .get::<&MalfunctionManager>(suit)
        .map(|m| m.has_eva_malfunction())
        .unwrap_or(false);
    let oxygen = inventory.amount(Resource::Oxygen);
    let water = inventory.amount(Resource::Water);
    Some(SuitReading {
        oxygen,
        oxygen_capacity: inventory.capacity(Resource::Oxygen),
        water,
        water_capacity: inventory.capacity(Resource::Water),
        life_support_ok: oxygen > 0.0 && water > 0.0,
        malfunction,
    })
}

/// The suit a holder (person or host) carries, if any.
pub fn find_suit(world: &World, holder: Entity) -> Option<Entity> {
    let inventory = world.get::<&Inventory>(holder).ok()?;
    let suit = inventory
        .units()
        .iter()
        .copied()
        .find(|&unit| world.get::<&EvaSuit>(unit).is_ok());
    suit
}

/// A suit in `host` storage that is free of malfunctions.
pub fn find_good_suit(world: &World, host: Entity) -> Option<Entity> {
    let inventory = world.get::<&Inventory>(host).ok()?;
    let suit = inventory.units().iter().copied().find(|&unit| {
        world.get::<&EvaSuit>(unit).is_ok()
            && world
                .get::<&MalfunctionManager>(unit)
                .map(|m| !m.has_malfunction())
                .unwrap_or(true)
    });
    suit
}

/// An empty container for `resource` in `host` storage.
pub fn find_container(world: &World, host: Entity, resource: Resource) -> Option<Entity> {
    let inventory = world.get::<&Inventory>(host).ok()?;
    let container = inventory.units().iter().copied().find(|&unit| {
        world
            .get::<&Container>(unit)
            .map(|c| c.resource == resource)
            .unwrap_or(false)
            && world
                .get::<&Inventory>(unit)
                .map(|inv| inv.total_mass() <= 0.0)
                .unwrap_or(false)
    });
    container
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Malfunction;

    #[test]
    fn test_good_suit_skips_broken() {
        let mut world = World::new();
        let broken = world.spawn((EvaSuit, EvaSuit::inventory(), EvaSuit::malfunctions(10.0)));
        world
            .get::<&mut MalfunctionManager>(broken)
            .unwrap()
            .malfunctions
            .push(Malfunction::general("Suit Puncture", 5.0));
        let good = world.spawn((EvaSuit, EvaSuit::inventory(), EvaSuit::malfunctions(10.0)));
        let mut storage = Inventory::new();
        storage.add_unit(broken);
        storage.add_unit(good);
        let base = world.spawn((storage,));

        assert_eq!(find_suit(&world, base), Some(broken));
        assert_eq!(find_good_suit(&world, base), Some(good));
    }

    #[test]
    fn test_reading_of_empty_suit_fails_life_support() {
        let mut world = World::new();
        let suit = world.spawn((EvaSuit, EvaSuit::inventory(), EvaSuit::malfunctions(10.0)));
        let reading = suit_reading(&world, suit).unwrap();
        assert!(!reading.life_support_ok);
        assert_eq!(reading.oxygen_capacity, SUIT_OXYGEN_CAPACITY);

        let rock = world.spawn((Inventory::new(),));
        assert!(suit_reading(&world, rock).is_none());
    }

    #[test]
    fn test_find_container_wants_empty_matching() {
        let mut world = World::new();
        let full = world.spawn((
            Container { resource: Resource::Ice },
            Container::inventory(Resource::Ice, 50.0).with_amount(Resource::Ice, 5.0),
        ));
        let regolith = world.spawn((
            Container {
                resource: Resource::Regolith,
            },
            Container::inventory(Resource::Regolith, 50.0),
        ));
        let empty = world.spawn((
            Container { resource: Resource::Ice },
            Container::inventory(Resource::Ice, 50.0),
        ));
        let mut storage = Inventory::new();
        for unit in [full, regolith, empty] {
            storage.add_unit(unit);
        }
        let base = world.spawn((storage,));
        assert_eq!(find_container(&world, base, Resource::Ice), Some(empty));
        assert_eq!(find_container(&world, base, Resource::Regolith), Some(regolith));
    }
}
