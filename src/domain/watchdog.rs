/// Background watchdogs, run every tick whatever the mode.
///
///   - global stuck: the boss has not moved `stuck_epsilon` in
///     `stuck_threshold` seconds → power blast, then relocate onto floor
///   - cardinal space: none of the four orthogonal neighbours is walkable
///     for `space_threshold` seconds → larger power blast
///
/// A power blast clears destructible walls (generated and player-built) in
/// a square around the boss. Boundary tiles survive.

use super::deadlight::Deadlight;
use super::grid::{BlastReport, Grid};

impl Deadlight {
    pub(super) fn run_watchdogs(&mut self, dt: f32, grid: &mut Grid) {
        let wd = self.tuning.watchdog.clone();
        let pos = self.pos();

        if self.watchdog.stuck.tick(pos, dt, wd.stuck_epsilon, wd.stuck_threshold) {
            log::info!("deadlight stuck at ({:.1}, {:.1}), power blast", self.x, self.y);
            self.power_blast(grid, wd.stuck_blast_tiles);
            self.reset_route();
        }

        let (tx, ty) = grid.tile_of(self.x, self.y);
        if grid.has_cardinal_floor(tx, ty) {
            self.watchdog.no_space_timer = 0.0;
        } else {
            self.watchdog.no_space_timer += dt;
            if self.watchdog.no_space_timer >= wd.space_threshold {
                log::info!("deadlight boxed in at ({tx}, {ty}), power blast");
                self.watchdog.no_space_timer = 0.0;
                self.power_blast(grid, wd.space_blast_tiles);
                self.reset_route();
            }
        }
    }

    /// Clear destructible walls within `radius_tiles` of the boss's tile,
    /// then step out of any wall the boss is still inside.
    pub fn power_blast(&mut self, grid: &mut Grid, radius_tiles: i32) -> BlastReport {
        let (tx, ty) = grid.tile_of(self.x, self.y);
        let report = grid.blast_square(tx, ty, radius_tiles);
        self.diagnostics.blasts += 1;
        log::debug!(
            "power blast r={radius_tiles}: {} generated, {} player-built cleared",
            report.generated,
            report.player_built
        );
        self.ensure_on_floor(grid);
        report
    }

    /// Relocate to the nearest floor tile centre if the boss is inside a
    /// blocking tile. Returns true when it moved.
    pub fn ensure_on_floor(&mut self, grid: &Grid) -> bool {
        let (tx, ty) = grid.tile_of(self.x, self.y);
        if grid.is_walkable(tx, ty) {
            return false;
        }
        match grid.nearest_floor_ring(tx, ty, self.tuning.watchdog.floor_search_tiles) {
            Some((fx, fy)) => {
                let (x, y) = grid.tile_center(fx, fy);
                self.x = x;
                self.y = y;
                self.watchdog.stuck.reset((x, y));
                self.diagnostics.relocations += 1;
                log::debug!("relocated onto floor at ({fx}, {fy})");
                true
            }
            None => false,
        }
    }
}
