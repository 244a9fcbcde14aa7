/// Headless session runner: loads config and map, drives a scripted player
/// against the Deadlight, and reports how the session ended.
///
/// Usage: `deadlight-sim [max_ticks]`

use std::time::Instant;

use deadlight::domain::entity::{FrameInput, MoveDir};
use deadlight::domain::grid::Grid;
use deadlight::sim::event::{GameEvent, PhaseKind};
use deadlight::sim::level;
use deadlight::{step, GameConfig, WorldState};

const DIRECTIONS: [MoveDir; 4] = [MoveDir::Left, MoveDir::Right, MoveDir::Up, MoveDir::Down];

fn main() {
    env_logger::init();

    let config = GameConfig::load();
    let max_ticks = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(n) => n,
            Err(e) => {
                eprintln!("invalid tick count {arg:?}: {e}");
                std::process::exit(2);
            }
        },
        None => config.general.max_ticks,
    };
    let seed = config.general.seed.unwrap_or_else(rand::random);
    let dt = config.tick_duration().as_secs_f32();

    let grid = level::load_grid(&config.map);
    let mut world = WorldState::new(grid, &config, seed);
    log::info!("seed {seed}, {max_ticks} ticks of {dt:.3}s");

    let started = Instant::now();
    while world.tick < max_ticks && !world.is_over() {
        let input = scripted_input(&world, dt);
        for event in step(&mut world, &input, dt) {
            log_event(&world, &event);
        }
    }

    print_summary(&world, seed, started.elapsed().as_secs_f32());
}

// ══════════════════════════════════════════════════════════════
// Scripted player
// ══════════════════════════════════════════════════════════════

/// Run from the boss while it hunts; close in and blast while it flees.
fn scripted_input(world: &WorldState, dt: f32) -> FrameInput {
    let player = world.player.pos();
    let boss = world.boss.pos();
    let reach = world.light_cfg.player_speed * dt;
    let dist = |p: (f32, f32)| (p.0 - boss.0).hypot(p.1 - boss.1);

    let open = DIRECTIONS.iter().copied().filter_map(|dir| {
        let (vx, vy) = dir.vector();
        let next = (player.0 + vx * reach, player.1 + vy * reach);
        free(&world.grid, next).then(|| (dir, dist(next)))
    });

    match world.phase {
        PhaseKind::Chase => FrameInput {
            movement: open.max_by(|a, b| a.1.total_cmp(&b.1)).map(|(d, _)| d),
            special_attack: false,
        },
        PhaseKind::Vulnerable => FrameInput {
            movement: open.min_by(|a, b| a.1.total_cmp(&b.1)).map(|(d, _)| d),
            special_attack: dist(player) <= world.light_cfg.special_radius,
        },
    }
}

fn free(grid: &Grid, p: (f32, f32)) -> bool {
    !grid.is_wall_at(p.0, p.1)
}

// ══════════════════════════════════════════════════════════════
// Reporting
// ══════════════════════════════════════════════════════════════

fn log_event(world: &WorldState, event: &GameEvent) {
    match event {
        GameEvent::PlayerDrained { .. } | GameEvent::BossDrained { .. } => {
            log::trace!("t={:.2} {event:?}", world.elapsed)
        }
        _ => log::debug!("t={:.2} {event:?}", world.elapsed),
    }
}

fn print_summary(world: &WorldState, seed: u64, wall_secs: f32) {
    let outcome = match world.outcome {
        Some(o) => format!("{o:?}"),
        None => "undecided".to_string(),
    };
    let d = &world.boss.diagnostics;
    println!("Deadlight session (seed {seed})");
    println!("  outcome:        {outcome}");
    println!("  ticks:          {} ({:.1}s simulated, {:.2}s wall)", world.tick, world.elapsed, wall_secs);
    println!("  phase:          {:?}", world.phase);
    println!("  player health:  {:.1} radiance {:.1}", world.player.health, world.player.radiance);
    println!("  boss health:    {:.1} radiance {:.1}", world.boss.health, world.boss.radiance);
    println!(
        "  boss ai:        {} searches, {} failures, {} stuck jitters, {} blasts, {} relocations",
        d.path_searches, d.path_failures, d.stuck_jitters, d.blasts, d.relocations
    );
}
