/// Light-overlap resolver: whose light touches whom, and the drain it
/// causes.
///
/// Chase phase: the boss's light drains the player.
/// Vulnerable phase: the player's light drains the boss.
/// A hit needs both range and line of sight; walls block light.

use crate::config::LightTuning;
use crate::domain::deadlight::Deadlight;
use crate::domain::entity::Player;
use crate::domain::grid::Grid;
use crate::domain::raycast::{self, RayParams};

use super::event::PhaseKind;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Overlap {
    None,
    /// The player was drained by this much health.
    PlayerHit(f32),
    /// The boss was drained by this much health.
    BossHit(f32),
}

/// Does the player's light reach the boss?
pub fn player_light_reaches(player: &Player, boss: &Deadlight, grid: &Grid, ray: &RayParams) -> bool {
    player.alive && player.radiance > 0.0 && raycast::reaches(grid, player.pos(), boss.pos(), player.radiance, ray)
}

pub fn resolve_light_overlap(
    player: &mut Player,
    boss: &mut Deadlight,
    dt: f32,
    phase: PhaseKind,
    grid: &Grid,
    tuning: &LightTuning,
    ray: &RayParams,
) -> Overlap {
    if !player.alive || !boss.alive || !(dt > 0.0) {
        return Overlap::None;
    }

    let ratio = tuning.min_radiance_ratio;
    player.ensure_radiance_floor(ratio);
    if boss.min_radiance.is_none() {
        boss.min_radiance = Some(boss.base_radiance * ratio);
    }
    boss.sync_radiance();

    let dist = (player.x - boss.x).hypot(player.y - boss.y);
    if dist <= f32::EPSILON {
        return Overlap::None;
    }

    match phase {
        PhaseKind::Chase => {
            if !boss.player_in_radiance(player.x, player.y, grid) {
                return Overlap::None;
            }
            let before = player.health;
            player.drain_light(tuning.player_health_drain * dt, tuning.player_base_drain * dt, ratio);
            Overlap::PlayerHit(before - player.health)
        }
        PhaseKind::Vulnerable => {
            if !player_light_reaches(player, boss, grid, ray) {
                return Overlap::None;
            }
            let before = boss.health;
            boss.drain_light(tuning.boss_health_drain * dt, tuning.boss_base_drain * dt, ratio);
            Overlap::BossHit(before - boss.health)
        }
    }
}
