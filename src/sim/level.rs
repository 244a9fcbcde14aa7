/// Map loader.
///
/// ## Sources (priority order):
///   1. `[map] file` from config.toml (ASCII map)
///   2. Built-in arena
///
/// ## Map format:
///   One text row per tile row. Lines starting with `;` are comments.
///   Rows of unequal length are padded with boundary.
///
/// ## Tile legend:
///   '.' or ' ' = Floor           '#' = Generated wall (destructible)
///   '+' = Player-built wall       '=' = Boundary (indestructible)
///
/// Whatever the file says, a border of `boundary_width` cells is forced to
/// boundary on load.

use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use crate::config::MapConfig;
use crate::domain::grid::Grid;
use crate::domain::tile::Tile;

/// Random spawn attempts before falling back to a deterministic scan.
const SPAWN_TRIES: usize = 512;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("could not read map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("map has no rows")]
    Empty,
    #[error("unknown map character {ch:?} at row {row}, column {col}")]
    BadChar { ch: char, row: usize, col: usize },
    #[error("map is {width}x{height}, too small for a {border}-cell border")]
    TooSmall { width: usize, height: usize, border: usize },
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

fn tile_for(ch: char) -> Option<Tile> {
    match ch {
        '.' | ' ' => Some(Tile::Floor),
        '#' => Some(Tile::Wall),
        '+' => Some(Tile::PlayerWall),
        '=' => Some(Tile::Boundary),
        _ => None,
    }
}

/// Parse an ASCII map and frame it with a boundary border.
pub fn parse_map(content: &str, tile_size: f32, boundary_width: usize) -> Result<Grid, MapError> {
    let mut rows: Vec<Vec<Tile>> = vec![];
    for (row, line) in content.lines().filter(|l| !l.starts_with(';')).enumerate() {
        let mut cells = Vec::with_capacity(line.len());
        for (col, ch) in line.chars().enumerate() {
            match tile_for(ch) {
                Some(t) => cells.push(t),
                None => return Err(MapError::BadChar { ch, row, col }),
            }
        }
        rows.push(cells);
    }

    while rows.last().map_or(false, |r| r.is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(MapError::Empty);
    }

    let mut grid = Grid::from_rows(rows, tile_size);
    // Need at least one interior cell inside the border.
    if grid.width() <= boundary_width * 2 || grid.height() <= boundary_width * 2 {
        return Err(MapError::TooSmall {
            width: grid.width(),
            height: grid.height(),
            border: boundary_width,
        });
    }
    grid.enforce_boundary(boundary_width);
    Ok(grid)
}

pub fn load_map_file(path: &Path, cfg: &MapConfig) -> Result<Grid, MapError> {
    let content = std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_map(&content, cfg.tile_size, cfg.boundary_width)
}

/// The configured map, or the built-in arena if none is set or it fails to
/// load.
pub fn load_grid(cfg: &MapConfig) -> Grid {
    if let Some(path) = &cfg.file {
        match load_map_file(path, cfg) {
            Ok(grid) => {
                log::info!("loaded map {} ({}x{})", path.display(), grid.width(), grid.height());
                return grid;
            }
            Err(e) => {
                log::warn!("{e}");
                log::warn!("using built-in arena");
            }
        }
    }
    builtin_arena(cfg)
}

// ══════════════════════════════════════════════════════════════
// Spawning
// ══════════════════════════════════════════════════════════════

/// A random floor tile centre. Falls back to the first floor tile in
/// row-major order, then to the map centre on a map with no floor.
pub fn spawn_on_floor<R: Rng>(grid: &Grid, rng: &mut R) -> (f32, f32) {
    if grid.is_empty() {
        return (0.0, 0.0);
    }
    for _ in 0..SPAWN_TRIES {
        let tx = rng.random_range(0..grid.width()) as i32;
        let ty = rng.random_range(0..grid.height()) as i32;
        if grid.is_walkable(tx, ty) {
            return grid.tile_center(tx, ty);
        }
    }
    match grid.floor_tiles().next() {
        Some((tx, ty)) => grid.tile_center(tx, ty),
        None => {
            let (w, h) = grid.extent();
            (w / 2.0, h / 2.0)
        }
    }
}

/// A random floor tile centre at least `min_distance` from `from`.
/// Falls back to the farthest floor tile when none qualifies.
pub fn spawn_away_from<R: Rng>(grid: &Grid, rng: &mut R, from: (f32, f32), min_distance: f32) -> (f32, f32) {
    let dist = |p: (f32, f32)| (p.0 - from.0).hypot(p.1 - from.1);
    for _ in 0..SPAWN_TRIES {
        let p = spawn_on_floor(grid, rng);
        if dist(p) >= min_distance {
            return p;
        }
    }
    grid.floor_tiles()
        .map(|(tx, ty)| grid.tile_center(tx, ty))
        .max_by(|a, b| dist(*a).total_cmp(&dist(*b)))
        .unwrap_or_else(|| spawn_on_floor(grid, rng))
}

// ══════════════════════════════════════════════════════════════
// Built-in arena
// ══════════════════════════════════════════════════════════════

/// One tile of the built-in arena; repeated `ARENA_REPEAT` times.
const ARENA_BLOCK: &[&str] = &[
    "                                                  ",
    "  ######        ####          ####        ######  ",
    "  #                #          #              #    ",
    "  #    ++++        #   ####   #     ++++     #    ",
    "  #                #          #              #    ",
    "       ####                         ####          ",
    "                                                  ",
    "    ##########      ##########      ##########    ",
    "                                                  ",
    "          #            ++            #            ",
    "          #    ####    ++    ####    #            ",
    "          #                          #            ",
    "   ####   #######            #########   ####     ",
    "                                                  ",
    "      ####          ######          ####          ",
    "      #                  #             #          ",
    "      #     ++++++       #    +++      #          ",
    "      #                  #             #          ",
    "      ########      ######       #######          ",
    "  ####      ####      ####      ####      ####    ",
    "                                                  ",
];

/// Blocks across, blocks down.
const ARENA_REPEAT: (usize, usize) = (3, 4);

/// Built-in arena: `ARENA_BLOCK` tiled inside a boundary frame.
pub fn builtin_arena(cfg: &MapConfig) -> Grid {
    let border = cfg.boundary_width;
    let (across, down) = ARENA_REPEAT;
    let block_w = ARENA_BLOCK.iter().map(|r| r.len()).max().unwrap_or(0);
    let block_h = ARENA_BLOCK.len();
    let mut grid = Grid::new(block_w * across + border * 2, block_h * down + border * 2, cfg.tile_size);

    for by in 0..down {
        for (row, line) in ARENA_BLOCK.iter().enumerate() {
            let ty = (border + by * block_h + row) as i32;
            for bx in 0..across {
                for (col, ch) in line.chars().enumerate() {
                    let tx = (border + bx * block_w + col) as i32;
                    grid.set_tile(tx, ty, tile_for(ch).unwrap_or(Tile::Boundary));
                }
            }
        }
    }
    grid.enforce_boundary(border);
    grid
}
