/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// Cell codes are the ones map data and collaborators exchange:
///   0 = floor, 1 = generated wall, 2 = player-built wall, 3 = boundary.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Floor,
    Wall,        // Generated wall, destructible
    PlayerWall,  // Built by the player, destructible
    Boundary,    // Map border, never destroyed
}

impl Tile {
    /// Decode a raw cell code. Unknown codes read as boundary so that
    /// corrupt data can never open a hole in the map.
    pub fn from_code(code: u8) -> Tile {
        match code {
            0 => Tile::Floor,
            1 => Tile::Wall,
            2 => Tile::PlayerWall,
            _ => Tile::Boundary,
        }
    }

    /// Can an entity occupy this cell? Only code 0 is walkable.
    pub fn is_walkable(self) -> bool {
        matches!(self, Tile::Floor)
    }

    /// Does this cell stop movement and light?
    pub fn is_blocking(self) -> bool {
        !self.is_walkable()
    }

    /// Can a blast clear this cell?
    pub fn is_destructible(self) -> bool {
        matches!(self, Tile::Wall | Tile::PlayerWall)
    }
}
