/// Pure game logic: tiles, grid, search, light rays and the boss itself.
/// Nothing in here reads the clock except the slow-search guard in `ai`.

pub mod ai;
pub mod deadlight;
pub mod entity;
pub mod grid;
pub mod pathfind;
pub mod raycast;
pub mod tile;
pub mod watchdog;
