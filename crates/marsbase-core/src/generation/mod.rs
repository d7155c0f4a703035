//! Generation - colony scenarios and the spawn helpers behind them.

mod colony;
mod names;

pub use colony::*;
pub use names::*;
