/// Events emitted during a simulation step.
/// Collaborators (presentation, audio, logs) consume these; the step
/// itself never acts on them.

use crate::domain::grid::BlastReport;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PhaseKind {
    Chase,
    Vulnerable,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PhaseChanged { phase: PhaseKind },
    /// The boss was moved by the orchestrator.
    BossTeleported { x: f32, y: f32 },
    /// No suitable floor tile for a hide-and-seek teleport.
    TeleportFailed,
    /// Player special attack cleared walls around (x, y).
    WallsBlasted { x: f32, y: f32, report: BlastReport },
    PlayerDrained { amount: f32 },
    BossDrained { amount: f32 },
    BossDefeated,
    PlayerExtinguished,
}
