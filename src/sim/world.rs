/// WorldState: the complete snapshot of a running session.
///
/// ## Ownership
///
///   - `grid`  : the only tile map. Mutated by the boss's blasts and the
///               player's special attack, nothing else.
///   - `player`: position and light, moved by scripted/real input.
///   - `boss`  : the Deadlight controller; the orchestrator drives its
///               mode hooks each step (see `step`).
///
/// ## Phase clock
///
/// The session alternates Chase (boss hunts) and Vulnerable (boss flees).
/// `phase_timer` counts up inside the current phase; every teleport timer
/// is reset on a phase switch.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{GameConfig, LightTuning, PhaseTuning};
use crate::domain::deadlight::Deadlight;
use crate::domain::entity::Player;
use crate::domain::grid::Grid;
use crate::domain::raycast::RayParams;

use super::event::PhaseKind;
use super::level;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    BossDefeated,
    PlayerExtinguished,
}

#[derive(Clone, Debug)]
pub struct WorldState {
    pub grid: Grid,
    pub player: Player,
    pub boss: Deadlight,

    pub phase: PhaseKind,
    /// Seconds spent in the current phase.
    pub phase_timer: f32,
    /// Chase phase: seconds the player has spent outside the boss's light.
    pub not_found_timer: f32,
    /// Chase phase: seconds until the next hide-and-seek teleport is allowed.
    pub teleport_cooldown: f32,
    /// Vulnerable phase: seconds since the last random teleport.
    pub vulnerable_teleport_timer: f32,

    /// Enemies other than the boss still alive. Gates the finishing blast.
    pub other_enemies_alive: usize,
    pub outcome: Option<Outcome>,

    pub tick: u64,
    pub elapsed: f32,

    pub phase_cfg: PhaseTuning,
    pub light_cfg: LightTuning,
    pub ray: RayParams,
    pub rng: ChaCha8Rng,
}

// ── Construction ──

impl WorldState {
    /// Spawn the player on a random floor tile and the boss at least
    /// `spawn_min_separation` away, already chasing.
    pub fn new(grid: Grid, config: &GameConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let light = config.light.clone();
        let phase = config.phase.clone();

        let (px, py) = level::spawn_on_floor(&grid, &mut rng);
        let (bx, by) = level::spawn_away_from(&grid, &mut rng, (px, py), phase.spawn_min_separation);
        let mut player = Player::new(px, py, light.player_health, light.player_light_radius);
        player.ensure_radiance_floor(light.min_radiance_ratio);

        let boss_seed: u64 = rng.random();
        let mut boss = Deadlight::new(bx, by, config.deadlight_tuning(), boss_seed);
        boss.start_chase(Some(phase.chase_duration));

        log::info!(
            "session start: player ({px:.0}, {py:.0}), deadlight ({bx:.0}, {by:.0}), map {}x{}",
            grid.width(),
            grid.height()
        );

        WorldState {
            grid,
            player,
            boss,
            phase: PhaseKind::Chase,
            phase_timer: 0.0,
            not_found_timer: 0.0,
            teleport_cooldown: 0.0,
            vulnerable_teleport_timer: 0.0,
            other_enemies_alive: 0,
            outcome: None,
            tick: 0,
            elapsed: 0.0,
            phase_cfg: phase,
            light_cfg: light,
            ray: config.map.ray_params(),
            rng,
        }
    }

    pub fn phase_duration(&self) -> f32 {
        match self.phase {
            PhaseKind::Chase => self.phase_cfg.chase_duration,
            PhaseKind::Vulnerable => self.phase_cfg.vulnerable_duration,
        }
    }

    pub fn phase_time_left(&self) -> f32 {
        (self.phase_duration() - self.phase_timer).max(0.0)
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn reset_phase_timers(&mut self) {
        self.phase_timer = 0.0;
        self.not_found_timer = 0.0;
        self.teleport_cooldown = 0.0;
        self.vulnerable_teleport_timer = 0.0;
    }
}
