/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// Every tunable the boss, the orchestrator and the harness use lives here,
/// grouped by concern:
///
///   [boss]         radiance and speed model
///   [chase]        chase-mode repath cadence, stuck handling, steering
///   [escape]       escape-mode target and repath cadence
///   [roam]         random search heading
///   [watchdog]     global stuck / cardinal space blasts, slow-path guard
///   [pathfinding]  A* node budgets by distance
///   [phase]        chase/vulnerable clock and boss teleports
///   [light]        player light and light-overlap drain rates
///   [map]          tile size, border, ray march, optional map file
///   [general]      seed and harness settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::raycast::RayParams;

// ── Errors ──

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

// ── Public Config Struct ──

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub boss: BossTuning,
    #[serde(default)]
    pub chase: ChaseTuning,
    #[serde(default)]
    pub escape: EscapeTuning,
    #[serde(default)]
    pub roam: RoamTuning,
    #[serde(default)]
    pub watchdog: WatchdogTuning,
    #[serde(default)]
    pub pathfinding: PathTuning,
    #[serde(default)]
    pub phase: PhaseTuning,
    #[serde(default)]
    pub light: LightTuning,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BossTuning {
    /// Starting (and maximum) radiance; health starts equal to it.
    #[serde(default = "default_base_radiance")]
    pub base_radiance: f32,
    /// Speed at full health.
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
    /// Speed at zero health.
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    #[serde(default = "default_escape_speed_mult")]
    pub escape_speed_mult: f32,
    /// Stacks on top of `escape_speed_mult` while the player's light is on the boss.
    #[serde(default = "default_under_light_speed_mult")]
    pub under_light_speed_mult: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChaseTuning {
    /// Seconds added by `start_chase` when no explicit time is given.
    #[serde(default = "default_chase_duration")]
    pub duration: f32,
    #[serde(default = "default_chase_repath_interval")]
    pub repath_interval: f32,
    /// Floor for `repath_interval` under `apply_multiplier`.
    #[serde(default = "default_min_repath_interval")]
    pub min_repath_interval: f32,
    #[serde(default = "default_player_move_threshold")]
    pub player_move_threshold: f32,
    /// Player displacement that forces an immediate repath (teleports).
    #[serde(default = "default_teleport_threshold")]
    pub teleport_threshold: f32,
    /// A route ending farther than this from the player is stale.
    #[serde(default = "default_stale_path_tolerance")]
    pub stale_path_tolerance: f32,
    #[serde(default = "default_chase_arrival_radius")]
    pub arrival_radius: f32,
    #[serde(default = "default_chase_stuck_threshold")]
    pub stuck_threshold: f32,
    #[serde(default = "default_stuck_epsilon")]
    pub stuck_epsilon: f32,
    /// Jitter magnitude (× speed·dt) after a stuck trip.
    #[serde(default = "default_stuck_jitter")]
    pub stuck_jitter: f32,
    /// Jitter magnitude (× speed·dt) when there is no route.
    #[serde(default = "default_no_path_jitter")]
    pub no_path_jitter: f32,
    /// Beyond this distance the boss steers directly instead of using A*.
    /// Infinite by default: always A*.
    #[serde(default = "default_astar_range")]
    pub astar_range: f32,
    #[serde(default = "default_steer_persistence")]
    pub steer_persistence: f32,
    #[serde(default = "default_chase_stuck_threshold")]
    pub steer_stuck_threshold: f32,
    #[serde(default = "default_stuck_epsilon")]
    pub steer_stuck_epsilon: f32,
    /// Tile radius scanned for a free tile when steering gets stuck.
    #[serde(default = "default_steer_unstick_tiles")]
    pub steer_unstick_tiles: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EscapeTuning {
    #[serde(default = "default_escape_repath_interval")]
    pub repath_interval: f32,
    #[serde(default = "default_escape_arrival_radius")]
    pub arrival_radius: f32,
    #[serde(default = "default_escape_stuck_threshold")]
    pub stuck_threshold: f32,
    #[serde(default = "default_stuck_epsilon")]
    pub stuck_epsilon: f32,
    #[serde(default = "default_stuck_jitter")]
    pub jitter: f32,
    /// Distance kept beyond the edge of the player's light.
    #[serde(default = "default_escape_light_buffer")]
    pub light_buffer: f32,
    /// Player light radius assumed when the caller does not pass one.
    #[serde(default = "default_fallback_light_radius")]
    pub fallback_light_radius: f32,
    #[serde(default = "default_escape_floor_search")]
    pub floor_search_tiles: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RoamTuning {
    #[serde(default = "default_heading_duration")]
    pub heading_duration: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WatchdogTuning {
    #[serde(default = "default_global_stuck_threshold")]
    pub stuck_threshold: f32,
    #[serde(default = "default_global_stuck_epsilon")]
    pub stuck_epsilon: f32,
    #[serde(default = "default_stuck_blast_tiles")]
    pub stuck_blast_tiles: i32,
    /// Seconds without any walkable orthogonal neighbour before blasting.
    #[serde(default = "default_space_threshold")]
    pub space_threshold: f32,
    #[serde(default = "default_space_blast_tiles")]
    pub space_blast_tiles: i32,
    /// Ring radius searched when relocating out of a wall.
    #[serde(default = "default_floor_search_tiles")]
    pub floor_search_tiles: i32,
    /// A single path search slower than this triggers blast-and-retry.
    #[serde(default = "default_path_blast_secs")]
    pub path_blast_secs: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PathTuning {
    #[serde(default = "default_near_budget")]
    pub near_budget: usize,
    #[serde(default = "default_far_budget")]
    pub far_budget: usize,
    #[serde(default = "default_far_distance")]
    pub far_distance: f32,
    #[serde(default = "default_extreme_budget")]
    pub extreme_budget: usize,
    #[serde(default = "default_extreme_distance")]
    pub extreme_distance: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PhaseTuning {
    #[serde(default = "default_chase_duration")]
    pub chase_duration: f32,
    #[serde(default = "default_vulnerable_duration")]
    pub vulnerable_duration: f32,
    /// Chase phase: teleport when the player stays out of the boss light this long.
    #[serde(default = "default_not_found_teleport")]
    pub not_found_teleport: f32,
    #[serde(default = "default_teleport_cooldown")]
    pub teleport_cooldown: f32,
    #[serde(default = "default_teleport_min_distance")]
    pub teleport_min_distance: f32,
    #[serde(default = "default_teleport_buffer")]
    pub teleport_buffer: f32,
    #[serde(default = "default_teleport_max_from_light")]
    pub teleport_max_from_light: f32,
    #[serde(default = "default_teleport_search_tiles")]
    pub teleport_search_tiles: i32,
    #[serde(default = "default_teleport_fallback_tiles")]
    pub teleport_fallback_tiles: i32,
    /// Vulnerable phase: seconds between random boss teleports.
    #[serde(default = "default_vulnerable_teleport_interval")]
    pub vulnerable_teleport_interval: f32,
    /// Minimum boss–player distance at spawn.
    #[serde(default = "default_spawn_min_separation")]
    pub spawn_min_separation: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LightTuning {
    #[serde(default = "default_player_health")]
    pub player_health: f32,
    #[serde(default = "default_player_light_radius")]
    pub player_light_radius: f32,
    /// Radiance floor as a fraction of base radiance.
    #[serde(default = "default_min_radiance_ratio")]
    pub min_radiance_ratio: f32,
    #[serde(default = "default_drain_rate")]
    pub player_health_drain: f32,
    #[serde(default = "default_drain_rate")]
    pub player_base_drain: f32,
    #[serde(default = "default_drain_rate")]
    pub boss_health_drain: f32,
    #[serde(default = "default_drain_rate")]
    pub boss_base_drain: f32,
    /// Player special attack (wall clearing / finishing blast) radius.
    #[serde(default = "default_special_radius")]
    pub special_radius: f32,
    #[serde(default = "default_player_speed")]
    pub player_speed: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    #[serde(default = "default_boundary_width")]
    pub boundary_width: usize,
    #[serde(default = "default_ray_step")]
    pub ray_step: f32,
    #[serde(default = "default_ray_pullback")]
    pub ray_pullback: f32,
    /// Optional ASCII map; the built-in arena is used otherwise.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneralConfig {
    /// Fixed RNG seed. Absent = seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

/// Everything the boss controller reads, bundled for `Deadlight::new`.
#[derive(Clone, Debug, Default)]
pub struct DeadlightTuning {
    pub boss: BossTuning,
    pub chase: ChaseTuning,
    pub escape: EscapeTuning,
    pub roam: RoamTuning,
    pub watchdog: WatchdogTuning,
    pub pathfinding: PathTuning,
    pub ray: RayParams,
}

// ── Defaults ──

fn default_base_radiance() -> f32 { 200.0 }
fn default_min_speed() -> f32 { 300.0 }
fn default_max_speed() -> f32 { 450.0 }
fn default_escape_speed_mult() -> f32 { 1.5 }
fn default_under_light_speed_mult() -> f32 { 5.0 }

fn default_chase_duration() -> f32 { 60.0 }
fn default_chase_repath_interval() -> f32 { 1.5 }
fn default_min_repath_interval() -> f32 { 0.35 }
fn default_player_move_threshold() -> f32 { 40.0 }
fn default_teleport_threshold() -> f32 { 200.0 }
fn default_stale_path_tolerance() -> f32 { 100.0 }
fn default_chase_arrival_radius() -> f32 { 6.0 }
fn default_chase_stuck_threshold() -> f32 { 0.5 }
fn default_stuck_epsilon() -> f32 { 4.0 }
fn default_stuck_jitter() -> f32 { 0.5 }
fn default_no_path_jitter() -> f32 { 0.3 }
fn default_astar_range() -> f32 { f32::INFINITY }
fn default_steer_persistence() -> f32 { 0.15 }
fn default_steer_unstick_tiles() -> i32 { 3 }

fn default_escape_repath_interval() -> f32 { 0.8 }
fn default_escape_arrival_radius() -> f32 { 8.0 }
fn default_escape_stuck_threshold() -> f32 { 0.3 }
fn default_escape_light_buffer() -> f32 { 150.0 }
fn default_fallback_light_radius() -> f32 { 250.0 }
fn default_escape_floor_search() -> i32 { 10 }

fn default_heading_duration() -> f32 { 2.0 }

fn default_global_stuck_threshold() -> f32 { 3.0 }
fn default_global_stuck_epsilon() -> f32 { 3.0 }
fn default_stuck_blast_tiles() -> i32 { 8 }
fn default_space_threshold() -> f32 { 999.0 } // effectively off; kept as a tuning knob
fn default_space_blast_tiles() -> i32 { 12 }
fn default_floor_search_tiles() -> i32 { 4 }
fn default_path_blast_secs() -> f32 { 3.0 }

fn default_near_budget() -> usize { 2000 }
fn default_far_budget() -> usize { 1000 }
fn default_far_distance() -> f32 { 500.0 }
fn default_extreme_budget() -> usize { 500 }
fn default_extreme_distance() -> f32 { 1000.0 }

fn default_vulnerable_duration() -> f32 { 60.0 }
fn default_not_found_teleport() -> f32 { 7.0 }
fn default_teleport_cooldown() -> f32 { 7.0 }
fn default_teleport_min_distance() -> f32 { 80.0 }
fn default_teleport_buffer() -> f32 { 30.0 }
fn default_teleport_max_from_light() -> f32 { 150.0 }
fn default_teleport_search_tiles() -> i32 { 25 }
fn default_teleport_fallback_tiles() -> i32 { 40 }
fn default_vulnerable_teleport_interval() -> f32 { 5.0 }
fn default_spawn_min_separation() -> f32 { 200.0 }

fn default_player_health() -> f32 { 100.0 }
fn default_player_light_radius() -> f32 { 300.0 }
fn default_min_radiance_ratio() -> f32 { 0.25 }
fn default_drain_rate() -> f32 { 5.0 }
fn default_special_radius() -> f32 { 100.0 }
fn default_player_speed() -> f32 { 160.0 }

fn default_tile_size() -> f32 { 8.0 }
fn default_boundary_width() -> usize { 3 }
fn default_ray_step() -> f32 { 5.0 }
fn default_ray_pullback() -> f32 { 3.0 }

fn default_tick_rate() -> u64 { 16 }
fn default_max_ticks() -> u64 { 60 * 150 } // 150 s at ~60 Hz: two full phases

impl Default for BossTuning {
    fn default() -> Self {
        BossTuning {
            base_radiance: default_base_radiance(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
            escape_speed_mult: default_escape_speed_mult(),
            under_light_speed_mult: default_under_light_speed_mult(),
        }
    }
}

impl Default for ChaseTuning {
    fn default() -> Self {
        ChaseTuning {
            duration: default_chase_duration(),
            repath_interval: default_chase_repath_interval(),
            min_repath_interval: default_min_repath_interval(),
            player_move_threshold: default_player_move_threshold(),
            teleport_threshold: default_teleport_threshold(),
            stale_path_tolerance: default_stale_path_tolerance(),
            arrival_radius: default_chase_arrival_radius(),
            stuck_threshold: default_chase_stuck_threshold(),
            stuck_epsilon: default_stuck_epsilon(),
            stuck_jitter: default_stuck_jitter(),
            no_path_jitter: default_no_path_jitter(),
            astar_range: default_astar_range(),
            steer_persistence: default_steer_persistence(),
            steer_stuck_threshold: default_chase_stuck_threshold(),
            steer_stuck_epsilon: default_stuck_epsilon(),
            steer_unstick_tiles: default_steer_unstick_tiles(),
        }
    }
}

impl Default for EscapeTuning {
    fn default() -> Self {
        EscapeTuning {
            repath_interval: default_escape_repath_interval(),
            arrival_radius: default_escape_arrival_radius(),
            stuck_threshold: default_escape_stuck_threshold(),
            stuck_epsilon: default_stuck_epsilon(),
            jitter: default_stuck_jitter(),
            light_buffer: default_escape_light_buffer(),
            fallback_light_radius: default_fallback_light_radius(),
            floor_search_tiles: default_escape_floor_search(),
        }
    }
}

impl Default for RoamTuning {
    fn default() -> Self {
        RoamTuning { heading_duration: default_heading_duration() }
    }
}

impl Default for WatchdogTuning {
    fn default() -> Self {
        WatchdogTuning {
            stuck_threshold: default_global_stuck_threshold(),
            stuck_epsilon: default_global_stuck_epsilon(),
            stuck_blast_tiles: default_stuck_blast_tiles(),
            space_threshold: default_space_threshold(),
            space_blast_tiles: default_space_blast_tiles(),
            floor_search_tiles: default_floor_search_tiles(),
            path_blast_secs: default_path_blast_secs(),
        }
    }
}

impl Default for PathTuning {
    fn default() -> Self {
        PathTuning {
            near_budget: default_near_budget(),
            far_budget: default_far_budget(),
            far_distance: default_far_distance(),
            extreme_budget: default_extreme_budget(),
            extreme_distance: default_extreme_distance(),
        }
    }
}

impl Default for PhaseTuning {
    fn default() -> Self {
        PhaseTuning {
            chase_duration: default_chase_duration(),
            vulnerable_duration: default_vulnerable_duration(),
            not_found_teleport: default_not_found_teleport(),
            teleport_cooldown: default_teleport_cooldown(),
            teleport_min_distance: default_teleport_min_distance(),
            teleport_buffer: default_teleport_buffer(),
            teleport_max_from_light: default_teleport_max_from_light(),
            teleport_search_tiles: default_teleport_search_tiles(),
            teleport_fallback_tiles: default_teleport_fallback_tiles(),
            vulnerable_teleport_interval: default_vulnerable_teleport_interval(),
            spawn_min_separation: default_spawn_min_separation(),
        }
    }
}

impl Default for LightTuning {
    fn default() -> Self {
        LightTuning {
            player_health: default_player_health(),
            player_light_radius: default_player_light_radius(),
            min_radiance_ratio: default_min_radiance_ratio(),
            player_health_drain: default_drain_rate(),
            player_base_drain: default_drain_rate(),
            boss_health_drain: default_drain_rate(),
            boss_base_drain: default_drain_rate(),
            special_radius: default_special_radius(),
            player_speed: default_player_speed(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            tile_size: default_tile_size(),
            boundary_width: default_boundary_width(),
            ray_step: default_ray_step(),
            ray_pullback: default_ray_pullback(),
            file: None,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            seed: None,
            tick_rate_ms: default_tick_rate(),
            max_ticks: default_max_ticks(),
        }
    }
}

// ── Derived views ──

impl MapConfig {
    pub fn ray_params(&self) -> RayParams {
        RayParams { step: self.ray_step, pullback: self.ray_pullback }
    }
}

impl PathTuning {
    /// Node budget for a search spanning `distance` world units.
    pub fn budget_for(&self, distance: f32) -> usize {
        if distance > self.extreme_distance {
            self.extreme_budget
        } else if distance > self.far_distance {
            self.far_budget
        } else {
            self.near_budget
        }
    }
}

impl WatchdogTuning {
    /// Saturates at `Duration::MAX` for values too large to represent.
    pub fn path_blast_after(&self) -> Duration {
        Duration::try_from_secs_f32(self.path_blast_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl GameConfig {
    pub fn deadlight_tuning(&self) -> DeadlightTuning {
        DeadlightTuning {
            boss: self.boss.clone(),
            chase: self.chase.clone(),
            escape: self.escape.clone(),
            roam: self.roam.clone(),
            watchdog: self.watchdog.clone(),
            pathfinding: self.pathfinding.clone(),
            ray: self.map.ray_params(),
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.general.tick_rate_ms.max(1))
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if !path.exists() {
                continue;
            }
            return match GameConfig::from_path(&path) {
                Ok(cfg) => {
                    log::info!("loaded {}", path.display());
                    cfg
                }
                Err(e) => {
                    log::warn!("{e}");
                    log::warn!("using default settings");
                    GameConfig::default()
                }
            };
        }
        GameConfig::default()
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        GameConfig::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: GameConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.map.tile_size > 0.0) {
            return Err(ConfigError::Invalid(format!("map.tile_size = {}", self.map.tile_size)));
        }
        if !(self.map.ray_step > 0.0) {
            return Err(ConfigError::Invalid(format!("map.ray_step = {}", self.map.ray_step)));
        }
        if self.boss.max_speed < self.boss.min_speed {
            return Err(ConfigError::Invalid(format!(
                "boss.max_speed ({}) below boss.min_speed ({})",
                self.boss.max_speed, self.boss.min_speed
            )));
        }
        let blast = self.watchdog.path_blast_secs;
        if !blast.is_finite() || blast < 0.0 {
            return Err(ConfigError::Invalid(format!("watchdog.path_blast_secs = {blast}")));
        }
        if !(0.0..=1.0).contains(&self.light.min_radiance_ratio) {
            return Err(ConfigError::Invalid(format!(
                "light.min_radiance_ratio = {}",
                self.light.min_radiance_ratio
            )));
        }
        Ok(())
    }
}

/// Candidate directories to search: exe dir + CWD + XDG config (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG config home (~/.config/deadlight)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".config/deadlight");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    dirs
}
