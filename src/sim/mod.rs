/// Session layer: world state, phase orchestration, light exchange,
/// map loading and the events a step emits.

pub mod event;
pub mod level;
pub mod light;
pub mod step;
pub mod world;
