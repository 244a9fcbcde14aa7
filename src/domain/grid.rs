/// Grid: the tile map shared by the boss, the player and the orchestrator.
///
/// ## Coordinates
///
/// Two spaces, converted here and nowhere else:
///   - tile space : `(tx, ty)` integer cell indices, `cells[ty][tx]`
///   - world space: continuous `(x, y)`, one tile = `tile_size` units
///
/// `tile_of(x, y)` floors world coordinates into tile space.
/// `tile_center(tx, ty)` maps a tile back to its centre point.
///
/// ## Mutation
///
/// Cells change only through `set_tile()` and the blast helpers.
/// Blasts clear destructible walls (codes 1 and 2) and never touch
/// boundary cells. Out-of-bounds reads return `Tile::Boundary`.

use super::tile::Tile;

#[derive(Clone, Debug)]
pub struct Grid {
    cells: Vec<Vec<Tile>>,
    width: usize,
    height: usize,
    tile_size: f32,
}

/// Tiles cleared by a blast, split by origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlastReport {
    pub generated: usize,
    pub player_built: usize,
}

impl BlastReport {
    pub fn total(&self) -> usize {
        self.generated + self.player_built
    }
}

// ── Construction ──

impl Grid {
    /// An all-floor grid.
    pub fn new(width: usize, height: usize, tile_size: f32) -> Self {
        Grid {
            cells: vec![vec![Tile::Floor; width]; height],
            width,
            height,
            tile_size,
        }
    }

    /// Build from rows. Short rows are padded with boundary cells.
    pub fn from_rows(mut rows: Vec<Vec<Tile>>, tile_size: f32) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, Tile::Boundary);
        }
        Grid { cells: rows, width, height, tile_size }
    }

    /// Build from raw cell codes (`codes[row][col]`).
    pub fn from_codes(codes: &[Vec<u8>], tile_size: f32) -> Self {
        let rows = codes
            .iter()
            .map(|r| r.iter().map(|&c| Tile::from_code(c)).collect())
            .collect();
        Grid::from_rows(rows, tile_size)
    }

    /// Force a `thickness`-cell border to boundary.
    pub fn enforce_boundary(&mut self, thickness: usize) {
        for ty in 0..self.height {
            for tx in 0..self.width {
                if tx < thickness
                    || ty < thickness
                    || tx + thickness >= self.width
                    || ty + thickness >= self.height
                {
                    self.cells[ty][tx] = Tile::Boundary;
                }
            }
        }
    }
}

// ── Queries ──

impl Grid {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// World-space size of the map `(w, h)`.
    pub fn extent(&self) -> (f32, f32) {
        (self.width as f32 * self.tile_size, self.height as f32 * self.tile_size)
    }

    #[inline]
    pub fn in_bounds(&self, tx: i32, ty: i32) -> bool {
        tx >= 0 && ty >= 0 && (tx as usize) < self.width && (ty as usize) < self.height
    }

    /// Tile at (tx, ty). Out of bounds = boundary.
    #[inline]
    pub fn tile(&self, tx: i32, ty: i32) -> Tile {
        if self.in_bounds(tx, ty) {
            self.cells[ty as usize][tx as usize]
        } else {
            Tile::Boundary
        }
    }

    #[inline]
    pub fn is_walkable(&self, tx: i32, ty: i32) -> bool {
        self.tile(tx, ty).is_walkable()
    }

    /// Tile containing the world point.
    #[inline]
    pub fn tile_of(&self, x: f32, y: f32) -> (i32, i32) {
        ((x / self.tile_size).floor() as i32, (y / self.tile_size).floor() as i32)
    }

    #[inline]
    pub fn tile_center(&self, tx: i32, ty: i32) -> (f32, f32) {
        let half = self.tile_size / 2.0;
        (tx as f32 * self.tile_size + half, ty as f32 * self.tile_size + half)
    }

    /// Is the world point inside the map rectangle?
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let (w, h) = self.extent();
        x >= 0.0 && y >= 0.0 && x < w && y < h
    }

    /// Does the world point lie in a blocking cell (or off the map)?
    #[inline]
    pub fn is_wall_at(&self, x: f32, y: f32) -> bool {
        let (tx, ty) = self.tile_of(x, y);
        self.tile(tx, ty).is_blocking()
    }

    /// Is at least one of the four orthogonal neighbours walkable?
    pub fn has_cardinal_floor(&self, tx: i32, ty: i32) -> bool {
        [(0, -1), (0, 1), (-1, 0), (1, 0)]
            .iter()
            .any(|&(dx, dy)| self.is_walkable(tx + dx, ty + dy))
    }

    pub fn floor_count(&self) -> usize {
        self.cells.iter().flatten().filter(|t| t.is_walkable()).count()
    }
}

// ── Mutation ──

impl Grid {
    /// Set a tile (bounds-checked, silently ignores out-of-range).
    #[inline]
    pub fn set_tile(&mut self, tx: i32, ty: i32, tile: Tile) {
        if self.in_bounds(tx, ty) {
            self.cells[ty as usize][tx as usize] = tile;
        }
    }

    /// Clear every destructible wall in the square of `radius` tiles
    /// around (tx, ty).
    pub fn blast_square(&mut self, tx: i32, ty: i32, radius: i32) -> BlastReport {
        let radius = radius.max(1);
        let mut report = BlastReport::default();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                self.clear_destructible(tx + dx, ty + dy, &mut report);
            }
        }
        report
    }

    /// Clear every destructible wall whose centre lies within `radius`
    /// world units of (x, y).
    pub fn blast_circle(&mut self, x: f32, y: f32, radius: f32) -> BlastReport {
        let mut report = BlastReport::default();
        if self.is_empty() || radius <= 0.0 {
            return report;
        }
        let (min_tx, min_ty) = self.tile_of(x - radius, y - radius);
        let (max_tx, max_ty) = self.tile_of(x + radius, y + radius);
        let min_tx = min_tx.max(0);
        let min_ty = min_ty.max(0);
        let max_tx = max_tx.min(self.width as i32 - 1);
        let max_ty = max_ty.min(self.height as i32 - 1);
        for ty in min_ty..=max_ty {
            for tx in min_tx..=max_tx {
                let (cx, cy) = self.tile_center(tx, ty);
                if (cx - x).hypot(cy - y) <= radius {
                    self.clear_destructible(tx, ty, &mut report);
                }
            }
        }
        report
    }

    fn clear_destructible(&mut self, tx: i32, ty: i32, report: &mut BlastReport) {
        let tile = self.tile(tx, ty);
        if !tile.is_destructible() {
            return;
        }
        if tile == Tile::PlayerWall {
            report.player_built += 1;
        } else {
            report.generated += 1;
        }
        self.set_tile(tx, ty, Tile::Floor);
    }
}

// ── Floor search ──

impl Grid {
    /// First walkable tile in growing square rings around (tx, ty),
    /// rings 1..=max_radius, scanned row by row.
    /// Returns (tx, ty) itself when it is already walkable.
    pub fn nearest_floor_ring(&self, tx: i32, ty: i32, max_radius: i32) -> Option<(i32, i32)> {
        if self.is_walkable(tx, ty) {
            return Some((tx, ty));
        }
        for r in 1..=max_radius {
            for dy in -r..=r {
                for dx in -r..=r {
                    if self.is_walkable(tx + dx, ty + dy) {
                        return Some((tx + dx, ty + dy));
                    }
                }
            }
        }
        None
    }

    /// Floor tile centre closest (Euclidean) to the world point, searching a
    /// square of `search_tiles` around its tile. The point's own tile wins
    /// outright when walkable.
    pub fn nearest_floor_to_point(&self, x: f32, y: f32, search_tiles: i32) -> Option<(f32, f32)> {
        let (tx, ty) = self.tile_of(x, y);
        if self.is_walkable(tx, ty) {
            return Some(self.tile_center(tx, ty));
        }
        let mut best: Option<((f32, f32), f32)> = None;
        for dy in -search_tiles..=search_tiles {
            for dx in -search_tiles..=search_tiles {
                if !self.is_walkable(tx + dx, ty + dy) {
                    continue;
                }
                let c = self.tile_center(tx + dx, ty + dy);
                let d = (c.0 - x).hypot(c.1 - y);
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((c, d));
                }
            }
        }
        best.map(|(c, _)| c)
    }

    /// All walkable tiles, row-major.
    pub fn floor_tiles(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells.iter().enumerate().flat_map(|(ty, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, t)| t.is_walkable())
                .map(move |(tx, _)| (tx as i32, ty as i32))
        })
    }
}
