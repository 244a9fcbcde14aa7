/// The step function: advances the session by one tick of `dt` seconds.
///
/// Processing order:
///   1. Player movement + special attack
///   2. Phase clock (Chase ↔ Vulnerable)
///   3. Boss update for the current phase (+ phase teleports)
///   4. Under-light flag
///   5. Light overlap (drain)
///   6. Win / lose check
///
/// Once an outcome is set the world is frozen and `step` returns no events.

use crate::config::PhaseTuning;
use crate::domain::entity::FrameInput;
use crate::domain::grid::Grid;

use super::event::{GameEvent, PhaseKind};
use super::level;
use super::light::{self, Overlap};
use super::world::{Outcome, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: &FrameInput, dt: f32) -> Vec<GameEvent> {
    if world.is_over() || !(dt > 0.0) {
        return vec![];
    }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;
    world.elapsed += dt;

    resolve_player(world, input, dt, &mut events);
    resolve_phase_clock(world, dt, &mut events);
    match world.phase {
        PhaseKind::Chase => resolve_chase_phase(world, dt, &mut events),
        PhaseKind::Vulnerable => resolve_vulnerable_phase(world, dt, &mut events),
    }
    resolve_under_light(world);
    resolve_light(world, dt, &mut events);
    resolve_outcome(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player(world: &mut WorldState, input: &FrameInput, dt: f32, events: &mut Vec<GameEvent>) {
    if !world.player.alive {
        return;
    }

    if let Some(dir) = input.movement {
        let (vx, vy) = dir.vector();
        let step = world.light_cfg.player_speed * dt;
        world.player.try_move(&world.grid, vx * step, vy * step);
    }

    if input.special_attack {
        let (px, py) = world.player.pos();
        let radius = world.light_cfg.special_radius;
        let report = world.grid.blast_circle(px, py, radius);
        if report.total() > 0 {
            events.push(GameEvent::WallsBlasted { x: px, y: py, report });
        }
        if world.phase == PhaseKind::Vulnerable {
            let all_dead = world.other_enemies_alive == 0;
            world.boss.take_blast(px, py, radius, all_dead);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Phase clock
// ══════════════════════════════════════════════════════════════

fn resolve_phase_clock(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    world.phase_timer += dt;
    if world.phase_timer < world.phase_duration() {
        return;
    }

    let next = match world.phase {
        PhaseKind::Chase => PhaseKind::Vulnerable,
        PhaseKind::Vulnerable => PhaseKind::Chase,
    };
    enter_phase(world, next);
    events.push(GameEvent::PhaseChanged { phase: next });
}

pub fn enter_phase(world: &mut WorldState, phase: PhaseKind) {
    world.phase = phase;
    world.reset_phase_timers();
    match phase {
        PhaseKind::Chase => {
            world.boss.set_escape_mode(false);
            world.boss.under_opposing_light = false;
            world.boss.start_chase(Some(world.phase_cfg.chase_duration));
        }
        PhaseKind::Vulnerable => {
            world.boss.stop_chase();
            world.boss.set_escape_mode(true);
        }
    }
    log::info!("phase → {:?} at {:.1}s", phase, world.elapsed);
}

// ══════════════════════════════════════════════════════════════
// Chase phase: hunt + hide-and-seek teleport
// ══════════════════════════════════════════════════════════════

fn resolve_chase_phase(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    let (px, py) = world.player.pos();
    world.boss.set_escape_mode(false);
    if !world.boss.is_chasing() {
        world.boss.start_chase(Some(world.phase_cfg.chase_duration));
    }
    world.boss.update(dt, px, py, &mut world.grid, Some(world.player.radiance));

    if world.boss.player_in_radiance(px, py, &world.grid) {
        world.not_found_timer = 0.0;
    } else {
        world.not_found_timer += dt;
    }
    world.teleport_cooldown = (world.teleport_cooldown - dt).max(0.0);

    if world.not_found_timer < world.phase_cfg.not_found_teleport || world.teleport_cooldown > 0.0 {
        return;
    }

    world.not_found_timer = 0.0;
    world.teleport_cooldown = world.phase_cfg.teleport_cooldown;
    match hide_spot(&world.grid, (px, py), world.player.radiance, &world.phase_cfg) {
        Some((x, y)) => {
            world.boss.teleport_to(x, y);
            log::info!("deadlight teleported near player to ({x:.0}, {y:.0})");
            events.push(GameEvent::BossTeleported { x, y });
        }
        None => {
            log::debug!("no hiding spot around ({px:.0}, {py:.0})");
            events.push(GameEvent::TeleportFailed);
        }
    }
}

/// A floor tile just outside the player's light.
///
/// Preference: the nearest floor tile at least
/// `max(radiance + buffer, min_distance)` away and within
/// `radiance + max_from_light`. Fallback: the nearest floor
/// tile at least `min_distance` away and outside the light, closer than
/// twice that limit. Last resort: the nearest floor tile outside the light
/// in a wider search.
pub fn hide_spot(
    grid: &Grid,
    player: (f32, f32),
    radiance: f32,
    cfg: &PhaseTuning,
) -> Option<(f32, f32)> {
    let want = (radiance + cfg.teleport_buffer).max(cfg.teleport_min_distance);
    let limit = radiance + cfg.teleport_max_from_light;

    let candidates = |radius: i32| floor_around(grid, player, radius);

    let preferred = candidates(cfg.teleport_search_tiles)
        .filter(|&(_, d)| d >= want && d <= limit)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((c, _)) = preferred {
        return Some(c);
    }

    let fallback = candidates(cfg.teleport_search_tiles)
        .filter(|&(_, d)| d >= cfg.teleport_min_distance && d > radiance && d < 2.0 * limit)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((c, _)) = fallback {
        return Some(c);
    }

    candidates(cfg.teleport_fallback_tiles)
        .filter(|&(_, d)| d > radiance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}

/// Walkable tile centres in the square of `radius` tiles around `from`,
/// paired with their distance to it.
fn floor_around(grid: &Grid, from: (f32, f32), radius: i32) -> impl Iterator<Item = ((f32, f32), f32)> + '_ {
    let (ftx, fty) = grid.tile_of(from.0, from.1);
    (-radius..=radius)
        .flat_map(move |dy| (-radius..=radius).map(move |dx| (ftx + dx, fty + dy)))
        .filter(move |&(tx, ty)| grid.is_walkable(tx, ty))
        .map(move |(tx, ty)| {
            let c = grid.tile_center(tx, ty);
            (c, (c.0 - from.0).hypot(c.1 - from.1))
        })
}

// ══════════════════════════════════════════════════════════════
// Vulnerable phase: flee + periodic random teleport
// ══════════════════════════════════════════════════════════════

fn resolve_vulnerable_phase(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    let (px, py) = world.player.pos();
    world.boss.stop_chase();
    world.boss.set_escape_mode(true);
    world.boss.update(dt, px, py, &mut world.grid, Some(world.player.radiance));

    world.vulnerable_teleport_timer += dt;
    if world.vulnerable_teleport_timer < world.phase_cfg.vulnerable_teleport_interval {
        return;
    }
    world.vulnerable_teleport_timer = 0.0;
    let (x, y) = level::spawn_on_floor(&world.grid, &mut world.rng);
    world.boss.teleport_to(x, y);
    log::info!("deadlight blinked to ({x:.0}, {y:.0})");
    events.push(GameEvent::BossTeleported { x, y });
}

// ══════════════════════════════════════════════════════════════
// Light
// ══════════════════════════════════════════════════════════════

fn resolve_under_light(world: &mut WorldState) {
    world.boss.under_opposing_light = world.phase == PhaseKind::Vulnerable
        && light::player_light_reaches(&world.player, &world.boss, &world.grid, &world.ray);
}

fn resolve_light(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    let overlap = light::resolve_light_overlap(
        &mut world.player,
        &mut world.boss,
        dt,
        world.phase,
        &world.grid,
        &world.light_cfg,
        &world.ray,
    );
    match overlap {
        Overlap::PlayerHit(amount) => events.push(GameEvent::PlayerDrained { amount }),
        Overlap::BossHit(amount) => events.push(GameEvent::BossDrained { amount }),
        Overlap::None => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Win / lose
// ══════════════════════════════════════════════════════════════

fn resolve_outcome(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let boss = &world.boss;
    if !boss.alive || boss.health <= 0.0 || boss.radiance <= 0.0 {
        world.outcome = Some(Outcome::BossDefeated);
        log::info!("deadlight defeated after {:.1}s", world.elapsed);
        events.push(GameEvent::BossDefeated);
        return;
    }
    let player = &world.player;
    if !player.alive || player.health <= 0.0 || player.radiance <= 0.0 {
        world.outcome = Some(Outcome::PlayerExtinguished);
        log::info!("player extinguished after {:.1}s", world.elapsed);
        events.push(GameEvent::PlayerExtinguished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::MoveDir;
    use crate::domain::grid::tests::grid_from;
    use crate::domain::tile::Tile;

    fn open_world(config: &GameConfig) -> WorldState {
        let mut grid = Grid::new(120, 80, 8.0);
        grid.enforce_boundary(3);
        WorldState::new(grid, config, 42)
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    #[test]
    fn phase_switches_after_duration() {
        let mut config = GameConfig::default();
        config.phase.chase_duration = 0.5;
        config.phase.vulnerable_duration = 0.5;
        let mut world = open_world(&config);

        let mut switched = vec![];
        for _ in 0..5 {
            for e in step(&mut world, &idle(), 0.25) {
                if let GameEvent::PhaseChanged { phase } = e {
                    switched.push(phase);
                }
            }
        }
        assert_eq!(switched, vec![PhaseKind::Vulnerable, PhaseKind::Chase]);
    }

    #[test]
    fn vulnerable_phase_makes_boss_escape() {
        let config = GameConfig::default();
        let mut world = open_world(&config);
        enter_phase(&mut world, PhaseKind::Vulnerable);
        step(&mut world, &idle(), 0.016);
        assert!(world.boss.is_escaping());
        assert!(!world.boss.is_chasing());

        enter_phase(&mut world, PhaseKind::Chase);
        step(&mut world, &idle(), 0.016);
        assert!(world.boss.is_chasing());
        assert_eq!(world.phase_timer, 0.016);
    }

    #[test]
    fn vulnerable_phase_teleports_on_interval() {
        let mut config = GameConfig::default();
        config.phase.vulnerable_teleport_interval = 0.5;
        let mut world = open_world(&config);
        enter_phase(&mut world, PhaseKind::Vulnerable);
        let mut teleports = 0;
        for _ in 0..4 {
            teleports += step(&mut world, &idle(), 0.25)
                .iter()
                .filter(|e| matches!(e, GameEvent::BossTeleported { .. }))
                .count();
        }
        assert_eq!(teleports, 2);
    }

    #[test]
    fn chase_phase_teleports_hidden_boss_near_player() {
        let mut config = GameConfig::default();
        config.phase.not_found_teleport = 0.2;
        // Boss parked behind a sealed wall so it can never see the player.
        let mut grid = Grid::new(120, 60, 8.0);
        grid.enforce_boundary(3);
        for ty in 0..60 {
            grid.set_tile(60, ty, Tile::Boundary);
        }
        let mut world = WorldState::new(grid, &config, 3);
        world.player.x = 200.0;
        world.player.y = 240.0;
        world.boss.teleport_to(800.0, 240.0);

        let mut landed = None;
        for _ in 0..5 {
            for e in step(&mut world, &idle(), 0.1) {
                if let GameEvent::BossTeleported { x, y } = e {
                    landed = Some((x, y));
                }
            }
        }
        let (x, y) = landed.expect("boss never teleported");
        let d = (x - 200.0).hypot(y - 240.0);
        assert!(d > world.player.radiance, "landed inside the light at {d}");
        assert!(d <= world.player.radiance + 150.0);
        let (tx, ty) = world.grid.tile_of(x, y);
        assert!(world.grid.is_walkable(tx, ty));
    }

    #[test]
    fn hide_spot_prefers_ring_just_outside_light() {
        let grid = Grid::new(120, 120, 8.0);
        let cfg = PhaseTuning::default();
        let spot = hide_spot(&grid, (480.0, 480.0), 100.0, &cfg).unwrap();
        let d = (spot.0 - 480.0).hypot(spot.1 - 480.0);
        assert!(d >= 130.0 && d < 134.0, "distance {d}");
    }

    #[test]
    fn hide_spot_none_when_no_floor_outside_light() {
        let grid = grid_from(&["....", "....", "...."], 8.0);
        let cfg = PhaseTuning::default();
        assert!(hide_spot(&grid, (16.0, 12.0), 300.0, &cfg).is_none());
    }

    #[test]
    fn special_attack_clears_walls_but_not_boundary() {
        let config = GameConfig::default();
        let mut grid = grid_from(&[
            "==========",
            "=........=",
            "=..#+#...=",
            "=...#....=",
            "=........=",
            "==========",
        ], 8.0);
        grid.enforce_boundary(1);
        let mut world = WorldState::new(grid, &config, 1);
        world.player.x = 28.0;
        world.player.y = 28.0;
        let input = FrameInput { movement: None, special_attack: true };
        let events = step(&mut world, &input, 0.016);
        assert!(events.iter().any(|e| matches!(e, GameEvent::WallsBlasted { .. })));
        assert_eq!(world.grid.tile(3, 2), Tile::Floor);
        assert_eq!(world.grid.tile(4, 2), Tile::Floor);
        assert_eq!(world.grid.tile(0, 0), Tile::Boundary);
    }

    #[test]
    fn finishing_blast_needs_vulnerable_phase() {
        let config = GameConfig::default();
        let mut world = open_world(&config);
        world.player.x = 480.0;
        world.player.y = 320.0;
        world.boss.teleport_to(520.0, 320.0);
        let attack = FrameInput { movement: None, special_attack: true };

        step(&mut world, &attack, 0.016);
        assert!(world.boss.alive);

        enter_phase(&mut world, PhaseKind::Vulnerable);
        world.boss.teleport_to(520.0, 320.0);
        world.other_enemies_alive = 1;
        step(&mut world, &attack, 0.016);
        assert!(world.boss.alive);

        world.other_enemies_alive = 0;
        world.boss.teleport_to(520.0, 320.0);
        let events = step(&mut world, &attack, 0.016);
        assert!(events.contains(&GameEvent::BossDefeated));
        assert_eq!(world.outcome, Some(Outcome::BossDefeated));
        // Frozen.
        assert!(step(&mut world, &idle(), 0.016).is_empty());
    }

    #[test]
    fn player_extinguished_ends_session() {
        let config = GameConfig::default();
        let mut world = open_world(&config);
        world.player.health = 0.0;
        let events = step(&mut world, &idle(), 0.016);
        assert!(events.contains(&GameEvent::PlayerExtinguished));
        assert_eq!(world.outcome, Some(Outcome::PlayerExtinguished));
    }

    #[test]
    fn player_moves_with_input() {
        let config = GameConfig::default();
        let mut world = open_world(&config);
        world.player.x = 480.0;
        world.player.y = 320.0;
        let input = FrameInput { movement: Some(MoveDir::Right), special_attack: false };
        step(&mut world, &input, 0.1);
        assert_eq!(world.player.x, 496.0);
    }
}
