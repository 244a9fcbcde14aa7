/// Coarse ray marching over the tile grid.
///
/// A ray advances in fixed steps of `RayParams::step` from its origin and
/// stops at the first sample that is off the map or inside a blocking tile.
/// Precision is bounded by the step size: callers get "roughly where the
/// light stops", never an exact wall intersection.

use super::grid::Grid;

/// Slack allowed when comparing a ray's reach with a target distance.
pub const REACH_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayParams {
    /// March step in world units.
    pub step: f32,
    /// How far a hit point is pulled back toward the origin.
    pub pullback: f32,
}

impl Default for RayParams {
    fn default() -> Self {
        RayParams { step: 5.0, pullback: 3.0 }
    }
}

/// Cast a ray from (ox, oy) at `angle_deg` (0° = +x, 90° = +y) for at most
/// `max_distance`. Returns the world point where it stopped.
pub fn cast_ray(
    grid: &Grid,
    ox: f32,
    oy: f32,
    angle_deg: f32,
    max_distance: f32,
    params: &RayParams,
) -> (f32, f32) {
    let ang = angle_deg.to_radians();
    let (dx, dy) = (ang.cos(), ang.sin());
    let step = params.step.max(f32::EPSILON);

    let mut prev = (ox, oy);
    let mut dist = 0.0f32;
    while dist < max_distance {
        dist = (dist + step).min(max_distance);
        let x = ox + dx * dist;
        let y = oy + dy * dist;
        if !grid.contains_point(x, y) {
            return (x, y);
        }
        if grid.is_wall_at(x, y) {
            let back = (x - dx * params.pullback, y - dy * params.pullback);
            // A step can land deep inside the tile; never report a point
            // past the near edge.
            if grid.is_wall_at(back.0, back.1) {
                return prev;
            }
            return back;
        }
        prev = (x, y);
    }
    (ox + dx * max_distance, oy + dy * max_distance)
}

/// Angle in degrees from `from` toward `to`, normalised to [0, 360).
pub fn angle_between(from: (f32, f32), to: (f32, f32)) -> f32 {
    (to.1 - from.1).atan2(to.0 - from.0).to_degrees().rem_euclid(360.0)
}

/// Does light of radius `radius` emitted at `from` reach `to`?
/// True only when `to` is within the radius and the ray toward it is not
/// stopped short by a wall.
pub fn reaches(grid: &Grid, from: (f32, f32), to: (f32, f32), radius: f32, params: &RayParams) -> bool {
    let dist = (to.0 - from.0).hypot(to.1 - from.1);
    if dist > radius {
        return false;
    }
    let hit = cast_ray(grid, from.0, from.1, angle_between(from, to), radius, params);
    let reach = (hit.0 - from.0).hypot(hit.1 - from.1);
    reach + REACH_EPSILON >= dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;

    fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
        (a.0 - b.0).hypot(a.1 - b.1)
    }

    #[test]
    fn unobstructed_ray_reaches_max_distance() {
        let g = Grid::new(50, 50, 8.0);
        let params = RayParams::default();
        for angle in [0.0f32, 37.0, 90.0, 181.0, 270.0] {
            let hit = cast_ray(&g, 200.0, 200.0, angle, 120.0, &params);
            assert!((dist(hit, (200.0, 200.0)) - 120.0).abs() < 1e-3, "angle {angle}");
        }
    }

    #[test]
    fn hit_stops_before_near_edge() {
        // Wall column at tile x=10 → world x in [80, 88).
        let g = grid_from(&["..........#.........."; 5], 8.0);
        let params = RayParams::default();
        for ox in [4.0f32, 11.3, 20.0, 33.7, 50.1, 61.0] {
            let hit = cast_ray(&g, ox, 20.0, 0.0, 200.0, &params);
            assert!(hit.0 < 80.0, "origin {ox}: hit at {}", hit.0);
            assert!(hit.0 > 80.0 - params.step - params.pullback - 1e-3);
        }
    }

    #[test]
    fn leaving_the_map_stops_the_ray() {
        let g = Grid::new(10, 10, 8.0);
        let hit = cast_ray(&g, 40.0, 40.0, 180.0, 500.0, &RayParams::default());
        assert!(hit.0 < 0.0);
        assert!(hit.0 > -5.0 - 1e-3);
    }

    #[test]
    fn angle_between_is_normalised() {
        assert!((angle_between((0.0, 0.0), (1.0, 0.0)) - 0.0).abs() < 1e-4);
        assert!((angle_between((0.0, 0.0), (0.0, 1.0)) - 90.0).abs() < 1e-4);
        assert!((angle_between((0.0, 0.0), (0.0, -1.0)) - 270.0).abs() < 1e-4);
    }

    #[test]
    fn reaches_respects_radius_and_walls() {
        let g = grid_from(&[
            "....................",
            "....................",
            "..........#.........",
            "....................",
        ], 8.0);
        let params = RayParams::default();
        // Row 0, clear line.
        assert!(reaches(&g, (4.0, 4.0), (150.0, 4.0), 200.0, &params));
        // Beyond radius.
        assert!(!reaches(&g, (4.0, 4.0), (150.0, 4.0), 100.0, &params));
        // Row 2, wall at tile 10 in between.
        assert!(!reaches(&g, (4.0, 20.0), (150.0, 20.0), 200.0, &params));
    }
}
