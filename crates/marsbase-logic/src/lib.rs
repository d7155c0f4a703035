//! Pure task-engine logic for Marsbase.
//!
//! This crate holds the formulas the agent engine runs on every tick,
//! independent of the ECS world that stores colony state. Functions take
//! plain data and return results, so each law can be unit-tested on its own
//! and reused by the headless harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`accident`] | Skill-scaled accident chance and per-tick Bernoulli trial |
//! | [`condition`] | Fatigue, hunger, stress and the derived performance rating |
//! | [`constants`] | Time units, EVA limits, airlock timings, weight cap |
//! | [`eva`] | EVA safety interrupt (darkness, suit state, performance) |
//! | [`selection`] | Weight sanitising and cumulative roulette-wheel selection |
//! | [`skills`] | Skill ledger, natural attributes, level progression |
//! | [`weights`] | Per-task probability heuristics |
//! | [`work`] | Work-rate, experience, stress and effort-scaling formulas |

pub mod accident;
pub mod condition;
pub mod constants;
pub mod eva;
pub mod selection;
pub mod skills;
pub mod weights;
pub mod work;
