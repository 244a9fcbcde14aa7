/// Entities the boss interacts with: the player, plus the radiance model
/// both of them share.
///
/// Radiance is the light radius an entity emits. It doubles as visibility
/// range and lethality range, and it is always derived from health:
///   - simple model: radiance = max(0, health)
///   - floor model (when `min_radiance` is set):
///     radiance = floor + (base_radiance − floor) × health_ratio

use super::grid::Grid;

/// Radiance for the given health, using the floor model when a floor is set.
pub fn coupled_radiance(health: f32, health_max: f32, base_radiance: f32, min_radiance: Option<f32>) -> f32 {
    match min_radiance {
        Some(floor) => {
            let ratio = if health_max > 0.0 { (health / health_max).clamp(0.0, 1.0) } else { 0.0 };
            floor + (base_radiance - floor) * ratio
        }
        None => health.max(0.0),
    }
}

/// Movement direction (continuous while key held)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub fn vector(self) -> (f32, f32) {
        match self {
            MoveDir::Left => (-1.0, 0.0),
            MoveDir::Right => (1.0, 0.0),
            MoveDir::Up => (0.0, -1.0),
            MoveDir::Down => (0.0, 1.0),
        }
    }
}

/// Frame input: separates movement from the special attack so both can fire
/// in one tick. Movement = continuous (held key), attack = edge-triggered.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<MoveDir>,
    pub special_attack: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub health_max: f32,
    pub base_radiance: f32,
    /// Radiance floor. `None` until the light system first syncs the player.
    pub min_radiance: Option<f32>,
    pub radiance: f32,
    pub alive: bool,
}

impl Player {
    pub fn new(x: f32, y: f32, health: f32, base_radiance: f32) -> Self {
        let mut p = Player {
            x, y,
            health,
            health_max: health,
            base_radiance,
            min_radiance: None,
            radiance: 0.0,
            alive: true,
        };
        p.sync_radiance();
        p
    }

    pub fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn sync_radiance(&mut self) {
        self.radiance = coupled_radiance(self.health, self.health_max, self.base_radiance, self.min_radiance);
    }

    /// Switch to the floor model (floor = `ratio` × base) if not already on it.
    pub fn ensure_radiance_floor(&mut self, ratio: f32) {
        if self.min_radiance.is_none() {
            self.min_radiance = Some(self.base_radiance * ratio);
        }
        self.sync_radiance();
    }

    /// Light damage: health and base radiance both shrink. Base radiance
    /// never drops below floor + 1; the floor follows the new base.
    pub fn drain_light(&mut self, health_amount: f32, base_amount: f32, floor_ratio: f32) {
        if !self.alive {
            return;
        }
        self.health = (self.health - health_amount.max(0.0)).max(0.0);
        let floor = self.min_radiance.unwrap_or(self.base_radiance * floor_ratio);
        self.base_radiance = (self.base_radiance - base_amount.max(0.0)).max(floor + 1.0);
        self.min_radiance = Some(self.base_radiance * floor_ratio);
        self.sync_radiance();
        if self.health <= 0.0 {
            self.alive = false;
        }
    }

    /// Move by (dx, dy) if the destination tile is floor; slides along one
    /// axis when the diagonal is blocked.
    pub fn try_move(&mut self, grid: &Grid, dx: f32, dy: f32) -> bool {
        for (mx, my) in [(dx, dy), (dx, 0.0), (0.0, dy)] {
            if mx == 0.0 && my == 0.0 {
                continue;
            }
            let (nx, ny) = (self.x + mx, self.y + my);
            if !grid.is_wall_at(nx, ny) {
                self.x = nx;
                self.y = ny;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;

    #[test]
    fn simple_model_clamps_to_health() {
        assert_eq!(coupled_radiance(120.0, 200.0, 200.0, None), 120.0);
        assert_eq!(coupled_radiance(-3.0, 200.0, 200.0, None), 0.0);
    }

    #[test]
    fn floor_model_interpolates() {
        assert_eq!(coupled_radiance(100.0, 100.0, 300.0, Some(75.0)), 300.0);
        assert_eq!(coupled_radiance(0.0, 100.0, 300.0, Some(75.0)), 75.0);
        assert_eq!(coupled_radiance(50.0, 100.0, 300.0, Some(75.0)), 187.5);
    }

    #[test]
    fn drain_light_floors_base_radiance() {
        let mut p = Player::new(0.0, 0.0, 100.0, 300.0);
        p.ensure_radiance_floor(0.25);
        p.drain_light(10.0, 10.0, 0.25);
        assert_eq!(p.health, 90.0);
        assert_eq!(p.base_radiance, 290.0);
        assert_eq!(p.min_radiance, Some(72.5));

        // A huge base drain stops one unit above the floor.
        p.drain_light(0.0, 10_000.0, 0.25);
        assert_eq!(p.base_radiance, 73.5);
        assert!(p.alive);
    }

    #[test]
    fn drain_light_kills_at_zero_health() {
        let mut p = Player::new(0.0, 0.0, 100.0, 300.0);
        p.drain_light(150.0, 0.0, 0.25);
        assert_eq!(p.health, 0.0);
        assert!(!p.alive);
    }

    #[test]
    fn try_move_slides_along_wall() {
        let g = grid_from(&["...", "...", "###"], 8.0);
        let mut p = Player::new(12.0, 12.0, 100.0, 300.0);
        // Down-right into the wall row: the x component survives.
        assert!(p.try_move(&g, 4.0, 8.0));
        assert_eq!(p.pos(), (16.0, 12.0));
        assert!(!p.try_move(&g, 0.0, 8.0));
    }
}
