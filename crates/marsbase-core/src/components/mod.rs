//! Component definitions for the colony ECS world.
//!
//! Components are plain data attached to entities. Behaviour lives in the
//! tasks and in the engine tick.

mod airlock;
mod building;
mod common;
mod equipment;
mod malfunction;
mod people;
mod resources;
mod vehicle;

pub use airlock::*;
pub use building::*;
pub use common::*;
pub use equipment::*;
pub use malfunction::*;
pub use people::*;
pub use resources::*;
pub use vehicle::*;
