/// Deadlight AI: the per-tick state machine.
///
/// Three modes:
///   1. **Chase**: follow an A* route to the player's live position.
///      Repaths are throttled by an interval timer, forced by a player
///      teleport, and triggered by the stuck detector.
///   2. **Escape**: route to a point just beyond the player's light.
///   3. **RandomSearch**: hold a random heading, re-roll on collision.
///
/// Chase also keeps a direct-pursuit steering branch for players beyond
/// `chase.astar_range` (infinite by default, so A* is always used).
///
/// Tick order: radiance + speed, chase countdown, mode tick, watchdogs.

use std::mem;
use std::time::Instant;

use super::deadlight::{distance, ChaseState, Deadlight, EscapeState, Mode, RoamState, Route, Steering};
use super::grid::Grid;
use super::pathfind::{self, PathError, Waypoint};

/// Compass directions for steering alternatives.
const COMPASS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (0.0, 1.0),
    (-std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (-1.0, 0.0),
    (-std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
    (0.0, -1.0),
    (std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
];

/// Jitter magnitude (× speed·dt) when steering has no free direction.
const STEER_JITTER: f32 = 0.6;
/// Weight of the hop length when picking an unstick tile.
const UNSTICK_HOP_WEIGHT: f32 = 0.5;

impl Deadlight {
    /// Advance the boss by `dt` seconds. `player_light` is the player's
    /// current light radius, used by escape mode (a configured fallback
    /// applies when absent). No-op once the boss is dead.
    pub fn update(&mut self, dt: f32, px: f32, py: f32, grid: &mut Grid, player_light: Option<f32>) {
        if !self.alive || !(dt > 0.0) {
            return;
        }

        self.sync_radiance();
        self.refresh_speed();

        let expired = match &mut self.mode {
            Mode::Chase(state) => {
                state.remaining -= dt;
                state.remaining <= 0.0
            }
            _ => false,
        };
        if expired {
            log::info!("chase timer expired, roaming");
            self.enter_random_search();
        }

        match mem::take(&mut self.mode) {
            Mode::Chase(mut state) => {
                self.chase_tick(&mut state, dt, (px, py), grid);
                self.mode = Mode::Chase(state);
            }
            Mode::Escape(mut state) => {
                self.escape_tick(&mut state, dt, (px, py), grid, player_light);
                self.mode = Mode::Escape(state);
            }
            Mode::RandomSearch(mut state) => {
                self.roam_tick(&mut state, dt, grid);
                self.mode = Mode::RandomSearch(state);
            }
        }

        self.run_watchdogs(dt, grid);
        log::trace!("deadlight at ({:.1}, {:.1}) speed {:.1}", self.x, self.y, self.speed);
    }

    // ── Chase mode ──

    fn chase_tick(&mut self, state: &mut ChaseState, dt: f32, player: (f32, f32), grid: &mut Grid) {
        let chase = self.tuning.chase.clone();
        if distance(self.pos(), player) > chase.astar_range {
            self.steer_toward(&mut state.steering, dt, player, grid);
            return;
        }

        state.repath_timer += dt;

        if let Some(end) = state.route.last() {
            if distance(end, player) > chase.stale_path_tolerance {
                state.route.clear();
                state.repath_timer = state.repath_timer.max(self.repath_interval);
            }
        }

        let moved = state.last_player.map(|last| distance(last, player));
        let interval_up = state.repath_timer >= self.repath_interval;
        let recompute = state.force_repath
            || state.route.is_empty()
            || moved.is_some_and(|m| m >= chase.teleport_threshold)
            || (interval_up && moved.map_or(true, |m| m >= chase.player_move_threshold));

        if recompute {
            state.route = Route::new(self.compute_path(grid, player));
            state.last_player = Some(player);
            state.repath_timer = 0.0;
            state.force_repath = false;
        }

        let step = self.speed * dt;
        if self.follow(&mut state.route, grid, step, chase.arrival_radius).is_none() {
            self.jitter(grid, step * chase.no_path_jitter);
        }

        if state.stuck.tick(self.pos(), dt, chase.stuck_epsilon, chase.stuck_threshold) {
            log::debug!("chase stuck at ({:.1}, {:.1}), forcing repath", self.x, self.y);
            state.force_repath = true;
            state.repath_timer = self.repath_interval;
            self.diagnostics.stuck_jitters += 1;
            self.jitter(grid, step * chase.stuck_jitter);
        }
    }

    /// Advance along `route`: consume every waypoint within `arrival`, then
    /// step toward the next one. `None` when nothing is left to follow,
    /// otherwise whether the step moved the boss.
    fn follow(&mut self, route: &mut Route, grid: &Grid, step: f32, arrival: f32) -> Option<bool> {
        while let Some(wp) = route.current() {
            if distance(self.pos(), wp) > arrival {
                return Some(self.step_toward(grid, wp, step));
            }
            route.advance();
        }
        None
    }

    // ── Direct-pursuit steering ──

    fn steer_toward(&mut self, steering: &mut Steering, dt: f32, player: (f32, f32), grid: &Grid) {
        let chase = self.tuning.chase.clone();
        let step = self.speed * dt;
        let (dx, dy) = (player.0 - self.x, player.1 - self.y);
        let len = dx.hypot(dy);
        if len <= f32::EPSILON {
            return;
        }
        let desired = (dx / len, dy / len);

        steering.hold -= dt;
        let preferred = match steering.preferred {
            Some(dir) if steering.hold > 0.0 => dir,
            _ => {
                steering.preferred = Some(desired);
                steering.hold = chase.steer_persistence;
                desired
            }
        };

        let moved = if self.try_direction(grid, preferred, step) {
            steering.last_ok = Some(preferred);
            true
        } else if steering.last_ok.is_some_and(|dir| self.try_direction(grid, dir, step)) {
            true
        } else if let Some(dir) = self.best_alternative(grid, desired, step) {
            steering.preferred = Some(dir);
            steering.hold = chase.steer_persistence;
            steering.last_ok = Some(dir);
            true
        } else {
            self.jitter(grid, step * STEER_JITTER)
        };
        log::trace!("steering moved={moved}");

        if steering.stuck.tick(self.pos(), dt, chase.steer_stuck_epsilon, chase.steer_stuck_threshold) {
            self.unstick_toward(grid, player, chase.steer_unstick_tiles);
            steering.preferred = None;
            steering.last_ok = None;
            steering.stuck.reset(self.pos());
        }
    }

    fn try_direction(&mut self, grid: &Grid, dir: (f32, f32), step: f32) -> bool {
        self.move_if_free(grid, self.x + dir.0 * step, self.y + dir.1 * step)
    }

    /// Compass directions ranked by agreement with `desired`; each tried at
    /// full then half step.
    fn best_alternative(&mut self, grid: &Grid, desired: (f32, f32), step: f32) -> Option<(f32, f32)> {
        let mut ranked = COMPASS;
        ranked.sort_by(|a, b| {
            let da = a.0 * desired.0 + a.1 * desired.1;
            let db = b.0 * desired.0 + b.1 * desired.1;
            db.total_cmp(&da)
        });
        for scale in [1.0, 0.5] {
            for &dir in &ranked {
                if self.try_direction(grid, dir, step * scale) {
                    return Some(dir);
                }
            }
        }
        None
    }

    /// Hop to the free tile within `radius` tiles that best trades distance
    /// to the player against hop length.
    fn unstick_toward(&mut self, grid: &Grid, player: (f32, f32), radius: i32) {
        let (tx, ty) = grid.tile_of(self.x, self.y);
        let here = self.pos();
        let mut best: Option<((f32, f32), f32)> = None;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if (dx, dy) == (0, 0) || !grid.is_walkable(tx + dx, ty + dy) {
                    continue;
                }
                let c = grid.tile_center(tx + dx, ty + dy);
                let score = distance(c, player) + UNSTICK_HOP_WEIGHT * distance(c, here);
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((c, score));
                }
            }
        }
        if let Some((c, _)) = best {
            log::debug!("steering unstuck: hop to ({:.1}, {:.1})", c.0, c.1);
            self.x = c.0;
            self.y = c.1;
        }
    }

    // ── Escape mode ──

    fn escape_tick(
        &mut self,
        state: &mut EscapeState,
        dt: f32,
        player: (f32, f32),
        grid: &mut Grid,
        player_light: Option<f32>,
    ) {
        let escape = self.tuning.escape.clone();
        let step = self.speed * dt;
        state.repath_timer += dt;

        // Sitting on the player: no "away" direction, only stuck handling.
        if let Some(target) = self.escape_target(grid, player, player_light) {
            if state.route.is_exhausted() || state.repath_timer >= escape.repath_interval {
                state.route = Route::new(self.compute_path(grid, target));
                state.repath_timer = 0.0;
            }

            match self.follow(&mut state.route, grid, step, escape.arrival_radius) {
                Some(true) => {}
                Some(false) => {
                    state.repath_timer = escape.repath_interval;
                    self.jitter(grid, step * escape.jitter);
                }
                None => {
                    self.jitter(grid, step * escape.jitter);
                }
            }
        }

        if state.stuck.tick(self.pos(), dt, escape.stuck_epsilon, escape.stuck_threshold) {
            log::debug!("escape stuck at ({:.1}, {:.1}), dropping route", self.x, self.y);
            state.route.clear();
        }
    }

    /// Point just beyond the player's light, on the far side from the
    /// player, snapped to floor. `None` when boss and player coincide.
    pub fn escape_target(&self, grid: &Grid, player: (f32, f32), player_light: Option<f32>) -> Option<(f32, f32)> {
        let escape = &self.tuning.escape;
        let (dx, dy) = (self.x - player.0, self.y - player.1);
        let len = dx.hypot(dy);
        if len <= f32::EPSILON {
            return None;
        }
        let reach = player_light.unwrap_or(escape.fallback_light_radius) + escape.light_buffer;
        let (w, h) = grid.extent();
        let ts = grid.tile_size();
        let tx = (player.0 + dx / len * reach).min(w - ts).max(ts);
        let ty = (player.1 + dy / len * reach).min(h - ts).max(ts);
        Some(grid.nearest_floor_to_point(tx, ty, escape.floor_search_tiles).unwrap_or((tx, ty)))
    }

    // ── Random search ──

    fn roam_tick(&mut self, state: &mut RoamState, dt: f32, grid: &Grid) {
        state.timer += dt;
        if state.timer >= self.tuning.roam.heading_duration {
            state.heading = self.random_heading();
            state.timer = 0.0;
        }
        let step = self.speed * dt;
        let dir = (state.heading.cos(), state.heading.sin());
        if self.try_direction(grid, dir, step) {
            return;
        }
        state.heading = self.random_heading();
        state.timer = 0.0;
        let dir = (state.heading.cos(), state.heading.sin());
        self.try_direction(grid, dir, step);
    }

    // ── Path computation ──

    /// A* from the boss to `goal` with a distance-tiered node budget.
    /// A search slower than `path_blast_secs` blasts nearby walls and is
    /// retried once. Failures come back as an empty route.
    pub fn compute_path(&mut self, grid: &mut Grid, goal: (f32, f32)) -> Vec<Waypoint> {
        let budget = self.tuning.pathfinding.budget_for(distance(self.pos(), goal));
        let started = Instant::now();
        let mut result = self.search(grid, goal, budget);

        if started.elapsed() >= self.tuning.watchdog.path_blast_after() {
            log::debug!("path search took {:?}, blasting and retrying", started.elapsed());
            let radius = self.tuning.watchdog.stuck_blast_tiles;
            self.power_blast(grid, radius);
            result = self.search(grid, goal, budget);
        }

        match result {
            Ok(path) => path,
            Err(e) => {
                self.diagnostics.path_failures += 1;
                log::debug!("no path to ({:.1}, {:.1}): {e}", goal.0, goal.1);
                Vec::new()
            }
        }
    }

    fn search(&mut self, grid: &Grid, goal: (f32, f32), budget: usize) -> Result<Vec<Waypoint>, PathError> {
        self.diagnostics.path_searches += 1;
        pathfind::search(grid, self.pos(), goal, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeadlightTuning;
    use crate::domain::grid::tests::grid_from;
    use crate::domain::tile::Tile;

    fn boss(x: f32, y: f32, tuning: DeadlightTuning) -> Deadlight {
        Deadlight::new(x, y, tuning, 11)
    }

    /// 15×15 solid block with a single floor cell in the middle and one in
    /// the corner.
    fn sealed_pocket() -> Grid {
        let mut g = Grid::new(15, 15, 8.0);
        for ty in 0..15 {
            for tx in 0..15 {
                g.set_tile(tx, ty, Tile::Wall);
            }
        }
        g.set_tile(7, 7, Tile::Floor);
        g.set_tile(1, 1, Tile::Floor);
        g
    }

    #[test]
    fn dead_boss_does_not_move() {
        let mut g = Grid::new(20, 20, 8.0);
        let mut b = boss(80.0, 80.0, DeadlightTuning::default());
        b.alive = false;
        b.start_chase(None);
        b.update(0.1, 10.0, 10.0, &mut g, None);
        assert_eq!(b.pos(), (80.0, 80.0));
        assert_eq!(b.chase_time_remaining(), 60.0);
    }

    #[test]
    fn chase_closes_distance_in_open_room() {
        let mut g = Grid::new(40, 40, 8.0);
        let mut b = boss(20.0, 20.0, DeadlightTuning::default());
        b.start_chase(None);
        let player = (260.0, 220.0);
        let start = distance(b.pos(), player);
        for _ in 0..30 {
            b.update(1.0 / 60.0, player.0, player.1, &mut g, None);
        }
        assert!(distance(b.pos(), player) < start - 50.0);
        assert!(b.diagnostics.path_searches >= 1);
    }

    #[test]
    fn chase_routes_around_wall() {
        let mut g = grid_from(&[
            "..........",
            "..........",
            "#########.",
            "..........",
            "..........",
        ], 8.0);
        let mut b = boss(4.0, 36.0, DeadlightTuning::default());
        b.start_chase(None);
        let mut closest = f32::MAX;
        for _ in 0..240 {
            b.update(1.0 / 60.0, 4.0, 4.0, &mut g, None);
            closest = closest.min(distance(b.pos(), (4.0, 4.0)));
        }
        assert!(closest < 8.0, "closest approach {closest}");
        // No wall was cleared to get there.
        assert_eq!(g.tile(0, 2), Tile::Wall);
    }

    #[test]
    fn chase_expiry_reverts_to_random_search() {
        let mut g = Grid::new(20, 20, 8.0);
        let mut b = boss(80.0, 80.0, DeadlightTuning::default());
        b.start_chase(Some(0.1));
        b.update(0.05, 20.0, 20.0, &mut g, None);
        assert!(b.is_chasing());
        b.update(0.06, 20.0, 20.0, &mut g, None);
        assert!(!b.is_chasing());
        assert!(matches!(b.mode(), Mode::RandomSearch(_)));
    }

    #[test]
    fn stuck_chase_forces_repath_and_jitters() {
        let mut g = sealed_pocket();
        let centre = g.tile_center(7, 7);
        let mut b = boss(centre.0, centre.1, DeadlightTuning::default());
        b.start_chase(None);
        let player = g.tile_center(1, 1);

        b.update(0.25, player.0, player.1, &mut g, None);
        assert_eq!(b.diagnostics.stuck_jitters, 0);
        b.update(0.25, player.0, player.1, &mut g, None);

        let Mode::Chase(state) = b.mode() else { panic!("not chasing") };
        assert!(state.force_repath);
        assert_eq!(b.diagnostics.stuck_jitters, 1);
        assert!(b.diagnostics.path_failures >= 2);
        assert_eq!(b.pos(), centre);
    }

    #[test]
    fn forced_repath_is_consumed_next_tick() {
        let mut g = sealed_pocket();
        let centre = g.tile_center(7, 7);
        let mut b = boss(centre.0, centre.1, DeadlightTuning::default());
        b.start_chase(None);
        let player = g.tile_center(1, 1);
        b.update(0.25, player.0, player.1, &mut g, None);
        b.update(0.25, player.0, player.1, &mut g, None);
        let searches = b.diagnostics.path_searches;
        b.update(0.01, player.0, player.1, &mut g, None);
        let Mode::Chase(state) = b.mode() else { panic!("not chasing") };
        assert!(!state.force_repath);
        assert!(b.diagnostics.path_searches > searches);
    }

    #[test]
    fn large_player_jump_repaths_immediately() {
        let mut g = Grid::new(60, 60, 8.0);
        let mut b = boss(100.0, 100.0, DeadlightTuning::default());
        b.start_chase(None);
        b.update(0.01, 140.0, 100.0, &mut g, None);
        let searches = b.diagnostics.path_searches;
        // Small move inside the interval: no repath.
        b.update(0.01, 145.0, 100.0, &mut g, None);
        assert_eq!(b.diagnostics.path_searches, searches);
        // Big jump: immediate repath.
        b.update(0.01, 400.0, 400.0, &mut g, None);
        assert_eq!(b.diagnostics.path_searches, searches + 1);
    }

    #[test]
    fn stale_route_is_dropped() {
        let mut g = Grid::new(60, 60, 8.0);
        let mut b = boss(100.0, 100.0, DeadlightTuning::default());
        b.start_chase(None);
        b.update(0.01, 300.0, 100.0, &mut g, None);
        let searches = b.diagnostics.path_searches;
        // 150 units off the route end but under the teleport threshold.
        b.update(0.01, 300.0, 250.0, &mut g, None);
        assert_eq!(b.diagnostics.path_searches, searches + 1);
        let Mode::Chase(state) = b.mode() else { panic!("not chasing") };
        let end = state.route.last().unwrap();
        assert!(distance(end, (300.0, 250.0)) < 8.0);
    }

    #[test]
    fn escape_target_is_farther_than_boss() {
        let g = Grid::new(120, 120, 8.0);
        let b = boss(500.0, 480.0, DeadlightTuning::default());
        let player = (480.0, 480.0);
        let target = b.escape_target(&g, player, Some(200.0)).unwrap();
        let (tx, ty) = g.tile_of(target.0, target.1);
        assert!(g.is_walkable(tx, ty));
        assert!(distance(target, player) > distance(b.pos(), player));
        assert!((distance(target, player) - 350.0).abs() < 8.0);
    }

    #[test]
    fn escape_target_clamped_and_snapped() {
        let mut g = Grid::new(40, 40, 8.0);
        g.enforce_boundary(3);
        let b = boss(280.0, 160.0, DeadlightTuning::default());
        let target = b.escape_target(&g, (200.0, 160.0), None).unwrap();
        let (tx, ty) = g.tile_of(target.0, target.1);
        assert!(g.is_walkable(tx, ty));
        assert!(target.0 < 320.0 - 8.0 * 3.0);
    }

    #[test]
    fn escape_target_undefined_on_player() {
        let g = Grid::new(20, 20, 8.0);
        let b = boss(80.0, 80.0, DeadlightTuning::default());
        assert!(b.escape_target(&g, (80.0, 80.0), None).is_none());
    }

    #[test]
    fn escape_moves_away_from_player() {
        let mut g = Grid::new(120, 120, 8.0);
        let mut b = boss(500.0, 480.0, DeadlightTuning::default());
        b.set_escape_mode(true);
        let player = (470.0, 480.0);
        let start = distance(b.pos(), player);
        for _ in 0..20 {
            b.update(1.0 / 60.0, player.0, player.1, &mut g, Some(200.0));
        }
        assert!(distance(b.pos(), player) > start + 40.0);
    }

    #[test]
    fn random_search_never_enters_walls() {
        let mut g = grid_from(&[
            "==========",
            "=........=",
            "=..#..#..=",
            "=........=",
            "=..#..#..=",
            "=........=",
            "==========",
        ], 8.0);
        let mut b = boss(12.0, 12.0, DeadlightTuning::default());
        for _ in 0..600 {
            b.update(1.0 / 60.0, 500.0, 500.0, &mut g, None);
            let (tx, ty) = g.tile_of(b.x, b.y);
            assert!(g.is_walkable(tx, ty), "boss entered ({tx}, {ty})");
        }
    }

    #[test]
    fn random_search_boxed_in_rerolls_once_and_stays() {
        let mut g = sealed_pocket();
        let centre = g.tile_center(7, 7);
        let mut b = boss(centre.0, centre.1, DeadlightTuning::default());
        b.mode = Mode::RandomSearch(RoamState { heading: 0.0, timer: 0.0 });

        // 300 px/s for 0.1 s: every heading leaves the one-cell pocket.
        b.update(0.1, 500.0, 500.0, &mut g, None);

        assert_eq!(b.pos(), centre);
        let Mode::RandomSearch(state) = b.mode() else { panic!("not roaming") };
        assert_eq!(state.timer, 0.0);
        assert_ne!(state.heading, 0.0);
    }

    #[test]
    fn pinned_escape_drops_route_after_stuck_threshold() {
        let mut g = sealed_pocket();
        let centre = g.tile_center(7, 7);
        let mut b = boss(centre.0, centre.1, DeadlightTuning::default());
        b.set_escape_mode(true);
        let player = g.tile_center(1, 1);

        b.update(0.15, player.0, player.1, &mut g, Some(100.0));
        let Mode::Escape(state) = b.mode() else { panic!("not escaping") };
        assert!(!state.route.is_empty());
        let jitters = b.diagnostics.jitters;
        assert!(jitters >= 1);

        b.update(0.15, player.0, player.1, &mut g, Some(100.0));
        let Mode::Escape(state) = b.mode() else { panic!("not escaping") };
        assert!(state.route.is_empty());
        assert!(b.diagnostics.jitters > jitters);
        assert_eq!(b.pos(), centre);
    }

    #[test]
    fn unbounded_blast_delay_never_panics() {
        let mut g = Grid::new(20, 20, 8.0);
        let mut tuning = DeadlightTuning::default();
        tuning.watchdog.path_blast_secs = f32::INFINITY;
        let mut b = boss(20.0, 20.0, tuning);
        b.start_chase(None);
        b.update(0.016, 120.0, 100.0, &mut g, None);
        assert!(b.diagnostics.path_searches >= 1);
        assert_eq!(b.diagnostics.blasts, 0);
    }

    #[test]
    fn slow_search_guard_blasts_and_retries() {
        let mut g = grid_from(&[
            "=========",
            "=...#...=",
            "=...#...=",
            "=...#...=",
            "=========",
        ], 8.0);
        let mut tuning = DeadlightTuning::default();
        tuning.watchdog.path_blast_secs = 0.0;
        let mut b = boss(12.0, 20.0, tuning);
        let path = b.compute_path(&mut g, (60.0, 20.0));
        assert!(!path.is_empty());
        assert_eq!(b.diagnostics.path_searches, 2);
        assert_eq!(g.tile(4, 2), Tile::Floor);
        assert_eq!(g.tile(0, 0), Tile::Boundary);
    }

    #[test]
    fn steering_branch_pursues_distant_player() {
        let mut g = Grid::new(80, 80, 8.0);
        let mut tuning = DeadlightTuning::default();
        tuning.chase.astar_range = 50.0;
        let mut b = boss(40.0, 40.0, tuning);
        b.start_chase(None);
        let player = (400.0, 40.0);
        for _ in 0..20 {
            b.update(1.0 / 60.0, player.0, player.1, &mut g, None);
        }
        assert!(b.x > 120.0);
        assert_eq!(b.diagnostics.path_searches, 0);
    }

    #[test]
    fn steering_slides_around_obstacle() {
        let mut g = Grid::new(80, 80, 8.0);
        for ty in 0..8 {
            g.set_tile(10, ty, Tile::Wall);
        }
        let mut tuning = DeadlightTuning::default();
        tuning.chase.astar_range = 0.0;
        let mut b = boss(60.0, 20.0, tuning);
        b.start_chase(None);
        let player = (400.0, 20.0);
        for _ in 0..120 {
            b.update(1.0 / 60.0, player.0, player.1, &mut g, None);
            let (tx, ty) = g.tile_of(b.x, b.y);
            assert!(g.is_walkable(tx, ty));
        }
        assert!(b.x > 100.0, "stuck at {:?}", b.pos());
    }
}
