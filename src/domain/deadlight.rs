/// The Deadlight boss: state, contracts and movement primitives.
///
/// The per-tick behaviour (`update`, mode ticks, steering) lives in `ai`,
/// the background stuck/space watchdogs in `watchdog`. Everything here is
/// the part other systems talk to:
///
///   - mode hooks        start_chase / stop_chase / set_escape_mode
///   - position overwrite teleport_to (route reset included)
///   - damage            drain_radiance / take_blast
///   - visibility        player_in_radiance
///   - difficulty        apply_multiplier
///
/// Modes are exclusive by construction: the boss is in exactly one
/// `Mode` variant, and each variant carries its own route and timers.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::DeadlightTuning;

use super::entity::coupled_radiance;
use super::grid::Grid;
use super::pathfind::Waypoint;
use super::raycast;

// ── Route ──

/// Waypoints plus a cursor. Replaced wholesale on every recomputation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Route {
    waypoints: Vec<Waypoint>,
    index: usize,
}

impl Route {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Route { waypoints, index: 0 }
    }

    /// No waypoints at all (never computed, cleared, or search failed).
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Every waypoint consumed (also true when empty).
    pub fn is_exhausted(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    pub fn current(&self) -> Option<Waypoint> {
        self.waypoints.get(self.index).copied()
    }

    pub fn last(&self) -> Option<Waypoint> {
        self.waypoints.last().copied()
    }

    pub fn advance(&mut self) {
        if self.index < self.waypoints.len() {
            self.index += 1;
        }
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.index = 0;
    }
}

// ── Stuck tracking ──

/// Net-displacement stuck detector: accumulates time while the entity stays
/// within `epsilon` of an anchor point; moving farther re-anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StuckTracker {
    anchor: (f32, f32),
    timer: f32,
}

impl StuckTracker {
    pub fn new(pos: (f32, f32)) -> Self {
        StuckTracker { anchor: pos, timer: 0.0 }
    }

    pub fn reset(&mut self, pos: (f32, f32)) {
        self.anchor = pos;
        self.timer = 0.0;
    }

    /// Feed one tick. Returns true (and re-arms) once the entity has been
    /// stuck for `threshold` seconds.
    pub fn tick(&mut self, pos: (f32, f32), dt: f32, epsilon: f32, threshold: f32) -> bool {
        if distance(pos, self.anchor) >= epsilon {
            self.reset(pos);
            return false;
        }
        self.timer += dt;
        if self.timer >= threshold {
            self.reset(pos);
            return true;
        }
        false
    }
}

// ── Mode payloads ──

/// Direction smoothing for direct-pursuit steering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Steering {
    pub(super) preferred: Option<(f32, f32)>,
    pub(super) hold: f32,
    pub(super) last_ok: Option<(f32, f32)>,
    pub(super) stuck: StuckTracker,
}

impl Steering {
    pub fn new(pos: (f32, f32)) -> Self {
        Steering { preferred: None, hold: 0.0, last_ok: None, stuck: StuckTracker::new(pos) }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChaseState {
    /// Seconds of chase left.
    pub remaining: f32,
    pub route: Route,
    pub repath_timer: f32,
    /// Player position at the last path computation.
    pub last_player: Option<(f32, f32)>,
    /// Set by the stuck detector; the next tick recomputes unconditionally.
    pub force_repath: bool,
    pub stuck: StuckTracker,
    pub steering: Steering,
}

impl ChaseState {
    fn new(remaining: f32, pos: (f32, f32)) -> Self {
        ChaseState {
            remaining,
            route: Route::default(),
            repath_timer: 0.0,
            last_player: None,
            force_repath: false,
            stuck: StuckTracker::new(pos),
            steering: Steering::new(pos),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EscapeState {
    pub route: Route,
    pub repath_timer: f32,
    pub stuck: StuckTracker,
}

impl EscapeState {
    fn new(pos: (f32, f32)) -> Self {
        EscapeState { route: Route::default(), repath_timer: 0.0, stuck: StuckTracker::new(pos) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoamState {
    /// Heading in radians.
    pub heading: f32,
    pub timer: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    Chase(ChaseState),
    Escape(EscapeState),
    RandomSearch(RoamState),
}

impl Default for Mode {
    fn default() -> Self {
        Mode::RandomSearch(RoamState { heading: 0.0, timer: 0.0 })
    }
}

/// Counters for logs and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub path_searches: u32,
    pub path_failures: u32,
    pub stuck_jitters: u32,
    /// Every jitter attempt, whatever triggered it.
    pub jitters: u32,
    pub blasts: u32,
    pub relocations: u32,
}

/// Background watchdog state (see `watchdog`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatchdogState {
    pub stuck: StuckTracker,
    pub no_space_timer: f32,
}

// ── Boss ──

#[derive(Clone, Debug)]
pub struct Deadlight {
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub health_max: f32,
    pub base_radiance: f32,
    /// Radiance floor; `None` = simple model (radiance tracks health).
    pub min_radiance: Option<f32>,
    pub radiance: f32,
    pub speed: f32,
    pub alive: bool,
    /// Set by the orchestrator while the player's light reaches the boss.
    pub under_opposing_light: bool,
    /// Chase repath interval; shortened by `apply_multiplier`.
    pub repath_interval: f32,
    /// Persistent difficulty factor applied to the re-derived base speed.
    pub aggression: f32,
    pub(super) mode: Mode,
    pub(super) watchdog: WatchdogState,
    pub(super) tuning: DeadlightTuning,
    pub(super) rng: ChaCha8Rng,
    pub diagnostics: Diagnostics,
}

impl Deadlight {
    pub fn new(x: f32, y: f32, tuning: DeadlightTuning, seed: u64) -> Self {
        let base = tuning.boss.base_radiance;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let heading = rng.random_range(0.0..std::f32::consts::TAU);
        Deadlight {
            x, y,
            health: base,
            health_max: base,
            base_radiance: base,
            min_radiance: None,
            radiance: base,
            speed: tuning.boss.min_speed,
            alive: true,
            under_opposing_light: false,
            repath_interval: tuning.chase.repath_interval,
            aggression: 1.0,
            mode: Mode::RandomSearch(RoamState { heading, timer: 0.0 }),
            watchdog: WatchdogState { stuck: StuckTracker::new((x, y)), no_space_timer: 0.0 },
            tuning,
            rng,
            diagnostics: Diagnostics::default(),
        }
    }

    #[inline]
    pub fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn health_ratio(&self) -> f32 {
        if self.health_max > 0.0 {
            (self.health / self.health_max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

// ── Mode hooks ──

impl Deadlight {
    /// Enter chase, or extend it. Time accumulates; the route, stuck and
    /// steering state and the last known player position are cleared.
    pub fn start_chase(&mut self, extra: Option<f32>) {
        let extra = extra.unwrap_or(self.tuning.chase.duration).max(0.0);
        let remaining = match &self.mode {
            Mode::Chase(state) => state.remaining.max(0.0),
            _ => 0.0,
        };
        self.mode = Mode::Chase(ChaseState::new(remaining + extra, self.pos()));
        log::debug!("chase started, {:.1}s remaining", remaining + extra);
    }

    /// Leave chase (no-op in other modes).
    pub fn stop_chase(&mut self) {
        if self.is_chasing() {
            self.enter_random_search();
        }
    }

    /// Enter or leave escape. Entering while chasing ends the chase;
    /// repeated calls with the same value keep the current escape route.
    pub fn set_escape_mode(&mut self, on: bool) {
        match (on, self.is_escaping()) {
            (true, false) => self.mode = Mode::Escape(EscapeState::new(self.pos())),
            (false, true) => self.enter_random_search(),
            _ => {}
        }
    }

    pub fn is_chasing(&self) -> bool {
        matches!(self.mode, Mode::Chase(_))
    }

    pub fn is_escaping(&self) -> bool {
        matches!(self.mode, Mode::Escape(_))
    }

    pub fn chase_time_remaining(&self) -> f32 {
        match &self.mode {
            Mode::Chase(state) => state.remaining.max(0.0),
            _ => 0.0,
        }
    }

    /// Overwrite the position and drop every route and stuck anchor.
    pub fn teleport_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.reset_route();
        self.watchdog.stuck.reset((x, y));
        self.watchdog.no_space_timer = 0.0;
    }

    /// Clear the current mode's route and stuck anchors.
    pub(super) fn reset_route(&mut self) {
        let pos = self.pos();
        match &mut self.mode {
            Mode::Chase(state) => {
                state.route.clear();
                state.last_player = None;
                state.stuck.reset(pos);
                state.steering = Steering::new(pos);
            }
            Mode::Escape(state) => {
                state.route.clear();
                state.stuck.reset(pos);
            }
            Mode::RandomSearch(_) => {}
        }
    }

    pub(super) fn enter_random_search(&mut self) {
        let heading = self.random_heading();
        self.mode = Mode::RandomSearch(RoamState { heading, timer: 0.0 });
    }
}

// ── Radiance, speed, damage ──

impl Deadlight {
    pub fn sync_radiance(&mut self) {
        self.radiance = coupled_radiance(self.health, self.health_max, self.base_radiance, self.min_radiance);
    }

    /// Base speed from health, scaled by aggression. Low health = fast.
    pub fn base_speed(&self) -> f32 {
        let boss = &self.tuning.boss;
        (boss.min_speed + (boss.max_speed - boss.min_speed) * (1.0 - self.health_ratio())) * self.aggression
    }

    /// Re-derive `speed` for the current mode. Runs every tick so that mode
    /// multipliers never compound.
    pub fn refresh_speed(&mut self) {
        let boss = &self.tuning.boss;
        let mut speed = self.base_speed();
        if self.is_escaping() {
            speed *= boss.escape_speed_mult;
            if self.under_opposing_light {
                speed *= boss.under_light_speed_mult;
            }
        }
        self.speed = speed;
    }

    /// Light damage. Non-positive amounts are ignored.
    pub fn drain_radiance(&mut self, amount: f32) {
        if !(amount > 0.0) {
            return;
        }
        self.health = (self.health - amount).max(0.0);
        self.sync_radiance();
        if self.health <= 0.0 {
            self.alive = false;
        }
    }

    /// Light damage from the player's light: health and base radiance both
    /// shrink, and `health_max` follows the new base. Base radiance never
    /// drops below floor + 1.
    pub fn drain_light(&mut self, health_amount: f32, base_amount: f32, floor_ratio: f32) {
        if !self.alive {
            return;
        }
        let floor = self.min_radiance.unwrap_or(self.base_radiance * floor_ratio);
        self.base_radiance = (self.base_radiance - base_amount.max(0.0)).max(floor + 1.0);
        self.min_radiance = Some(self.base_radiance * floor_ratio);
        self.health_max = self.base_radiance;
        self.health = (self.health - health_amount.max(0.0)).clamp(0.0, self.health_max);
        self.sync_radiance();
        if self.health <= 0.0 {
            self.alive = false;
        }
    }

    /// Finishing blast. Kills the boss only when every other enemy is dead
    /// and the blast origin is within `radius` of the boss.
    pub fn take_blast(&mut self, px: f32, py: f32, radius: f32, all_entities_dead: bool) -> bool {
        if !self.alive || !all_entities_dead {
            return false;
        }
        if distance((px, py), self.pos()) > radius {
            return false;
        }
        self.health = 0.0;
        self.radiance = 0.0;
        self.alive = false;
        log::info!("deadlight destroyed by finishing blast");
        true
    }

    /// Difficulty scaling. Invalid multipliers are ignored.
    pub fn apply_multiplier(&mut self, mult: f32) {
        if !mult.is_finite() || mult <= 0.0 {
            log::warn!("ignoring speed multiplier {mult}");
            return;
        }
        self.speed *= mult;
        self.aggression *= mult;
        self.repath_interval = (self.repath_interval / mult).max(self.tuning.chase.min_repath_interval);
    }

    /// Is the player inside the boss's light with nothing in between?
    pub fn player_in_radiance(&self, px: f32, py: f32, grid: &Grid) -> bool {
        self.alive
            && self.radiance > 0.0
            && raycast::reaches(grid, self.pos(), (px, py), self.radiance, &self.tuning.ray)
    }
}

// ── Movement primitives ──

impl Deadlight {
    /// Move to (nx, ny) if the tile there is floor.
    pub(super) fn move_if_free(&mut self, grid: &Grid, nx: f32, ny: f32) -> bool {
        let (tx, ty) = grid.tile_of(nx, ny);
        if grid.is_walkable(tx, ty) {
            self.x = nx;
            self.y = ny;
            true
        } else {
            false
        }
    }

    /// Step toward `target` by at most `step`, sliding along one axis when the
    /// direct move is blocked.
    pub(super) fn step_toward(&mut self, grid: &Grid, target: (f32, f32), step: f32) -> bool {
        let (dx, dy) = (target.0 - self.x, target.1 - self.y);
        let dist = dx.hypot(dy);
        if dist <= f32::EPSILON {
            return false;
        }
        let s = step.min(dist);
        let (mx, my) = (dx / dist * s, dy / dist * s);
        self.move_if_free(grid, self.x + mx, self.y + my)
            || (mx != 0.0 && self.move_if_free(grid, self.x + mx, self.y))
            || (my != 0.0 && self.move_if_free(grid, self.x, self.y + my))
    }

    /// Random nudge: one random direction, then its opposite.
    pub(super) fn jitter(&mut self, grid: &Grid, magnitude: f32) -> bool {
        self.diagnostics.jitters += 1;
        let angle = self.random_heading();
        let (dx, dy) = (angle.cos() * magnitude, angle.sin() * magnitude);
        self.move_if_free(grid, self.x + dx, self.y + dy) || self.move_if_free(grid, self.x - dx, self.y - dy)
    }

    pub(super) fn random_heading(&mut self) -> f32 {
        self.rng.random_range(0.0..std::f32::consts::TAU)
    }
}

#[inline]
pub(super) fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
