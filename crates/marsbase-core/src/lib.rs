//! Marsbase Core - Mars Colony Agent Engine
//!
//! An ECS-based engine deciding what every colonist of a Mars settlement
//! does on each tick, and carrying those decisions out: sleeping, eating,
//! repairs, research, and outdoor work through the airlocks.
//!
//! # Architecture
//!
//! Colony state lives in a `hecs` world:
//! - **Entities**: colonists, the settlement, its buildings, vehicles, suits and containers
//! - **Components**: plain data (Inventory, Airlock, MalfunctionManager, Activity, ...)
//! - **Tasks**: per-colonist phase machines chosen by weighted random selection
//!
//! Each colonist owns a [`tasks::TaskManager`] holding a stack of tasks;
//! a task may push a sub-task (an airlock transit, say) and resume once
//! it finishes. The [`engine::ColonyEngine`] ticks the world and then
//! every manager in a fixed order.
//!
//! # Example
//!
//! ```rust,no_run
//! use marsbase_core::prelude::*;
//!
//! let spec = ColonySpec::load("data/colony.json").unwrap();
//! let mut engine = ColonyEngine::from_spec(&spec, EngineConfig::default()).unwrap();
//!
//! // one sol in 1-millisol ticks
//! for _ in 0..1000 {
//!     engine.update(1.0);
//! }
//! ```

pub mod clock;
pub mod components;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod generation;
pub mod surface;
pub mod tasks;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::clock::MarsClock;
    pub use crate::components::*;
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::engine::ColonyEngine;
    pub use crate::error::ClaimError;
    pub use crate::generation::ColonySpec;
    pub use crate::surface::{Coordinates, FixedSurface, MarsSurface, SurfaceFeatures};
    pub use crate::tasks::{Task, TaskKind, TaskManager, TaskRegistry};
}
