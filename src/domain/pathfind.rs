/// Grid pathfinding: A* over walkable tiles.
///
/// Rules:
///   - 4-directional moves only, unit cost, Manhattan heuristic
///   - any non-floor tile is pruned (walls, player walls, boundary)
///   - lowest f first; equal f resolved by insertion order
///   - expansion is capped at `max_nodes`; hitting the cap aborts the
///     search with no partial result
///
/// Output is a list of tile-centre world points from the start tile to the
/// goal tile, both included.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use thiserror::Error;

use super::grid::Grid;

const DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A world-space tile centre on a route.
pub type Waypoint = (f32, f32);

/// Why a search produced no route. The controller treats every variant the
/// same way (fall back and retry later); the distinction is for logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("grid has no cells")]
    EmptyGrid,
    #[error("endpoint lies outside the map")]
    OutOfBounds,
    #[error("endpoint tile is not walkable")]
    BlockedEndpoint,
    #[error("no route between endpoints")]
    NoRoute,
    #[error("search aborted after {0} expansions")]
    BudgetExhausted(usize),
}

/// Open-set entry. Ordered so that `BinaryHeap` pops the lowest f, then the
/// earliest pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenNode {
    f: u32,
    seq: u64,
    g: u32,
    idx: usize,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn manhattan(ax: i32, ay: i32, bx: i32, by: i32) -> u32 {
    ax.abs_diff(bx) + ay.abs_diff(by)
}

/// Search a route from `start` to `goal` (world positions).
pub fn search(
    grid: &Grid,
    start: (f32, f32),
    goal: (f32, f32),
    max_nodes: usize,
) -> Result<Vec<Waypoint>, PathError> {
    if grid.is_empty() {
        return Err(PathError::EmptyGrid);
    }

    let (sx, sy) = grid.tile_of(start.0, start.1);
    let (gx, gy) = grid.tile_of(goal.0, goal.1);
    if !grid.in_bounds(sx, sy) || !grid.in_bounds(gx, gy) {
        return Err(PathError::OutOfBounds);
    }
    if !grid.is_walkable(sx, sy) || !grid.is_walkable(gx, gy) {
        return Err(PathError::BlockedEndpoint);
    }

    let width = grid.width();
    let index = |x: i32, y: i32| y as usize * width + x as usize;
    let start_idx = index(sx, sy);
    let goal_idx = index(gx, gy);

    let cells = width * grid.height();
    let mut cost = vec![u32::MAX; cells];
    let mut came_from = vec![usize::MAX; cells];

    let mut open = BinaryHeap::with_capacity(256);
    cost[start_idx] = 0;
    open.push(OpenNode { f: manhattan(sx, sy, gx, gy), seq: 0, g: 0, idx: start_idx });
    let mut seq: u64 = 1;
    let mut expanded = 0usize;

    while let Some(node) = open.pop() {
        // Superseded by a cheaper push of the same tile.
        if node.g > cost[node.idx] {
            continue;
        }

        expanded += 1;
        if expanded > max_nodes {
            return Err(PathError::BudgetExhausted(max_nodes));
        }

        if node.idx == goal_idx {
            return Ok(reconstruct(grid, &came_from, start_idx, goal_idx));
        }

        let cx = (node.idx % width) as i32;
        let cy = (node.idx / width) as i32;
        for &(dx, dy) in &DIRS {
            let nx = cx + dx;
            let ny = cy + dy;
            if !grid.is_walkable(nx, ny) {
                continue;
            }
            let ni = index(nx, ny);
            let ng = node.g + 1;
            if ng < cost[ni] {
                cost[ni] = ng;
                came_from[ni] = node.idx;
                open.push(OpenNode { f: ng + manhattan(nx, ny, gx, gy), seq, g: ng, idx: ni });
                seq += 1;
            }
        }
    }

    Err(PathError::NoRoute)
}

/// Same as `search`, with every failure collapsed into an empty route.
pub fn find_path(grid: &Grid, start: (f32, f32), goal: (f32, f32), max_nodes: usize) -> Vec<Waypoint> {
    search(grid, start, goal, max_nodes).unwrap_or_default()
}

fn reconstruct(grid: &Grid, came_from: &[usize], start_idx: usize, goal_idx: usize) -> Vec<Waypoint> {
    let width = grid.width();
    let mut path = Vec::new();
    let mut cur = goal_idx;
    loop {
        path.push(grid.tile_center((cur % width) as i32, (cur / width) as i32));
        if cur == start_idx {
            break;
        }
        cur = came_from[cur];
    }
    path.reverse();
    path
}
