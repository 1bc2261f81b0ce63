pub mod cozy;

pub use cozy::{PlayedMove, Position};
