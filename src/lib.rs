/// Deadlight: the pursuit AI of a light-draining boss on a tile maze,
/// with the session layer that drives it (phases, teleports, light
/// exchange) and the configuration it reads.

pub mod config;
pub mod domain;
pub mod sim;

pub use config::{ConfigError, DeadlightTuning, GameConfig};
pub use domain::deadlight::{Deadlight, Mode};
pub use domain::grid::Grid;
pub use domain::pathfind::{find_path, PathError};
pub use domain::raycast::{cast_ray, RayParams};
pub use sim::step::step;
pub use sim::world::WorldState;
