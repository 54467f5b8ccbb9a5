use serde::{Deserialize, Serialize};

use crate::jobs::{GridPos, JobId};

/// Player position in world units; one grid cell spans `tile_size` units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub fn world_to_cell(position: WorldPos, tile_size: f64) -> GridPos {
    GridPos::new(
        (position.x / tile_size).floor() as i32,
        (position.y / tile_size).floor() as i32,
    )
}

pub fn cell_center(cell: GridPos, tile_size: f64) -> WorldPos {
    WorldPos::new(
        cell.x as f64 * tile_size + tile_size / 2.0,
        cell.y as f64 * tile_size + tile_size / 2.0,
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupMarker {
    pub job_id: JobId,
    pub cell: GridPos,
    pub expires_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoffMarker {
    pub job_id: JobId,
    pub cell: GridPos,
    /// Arriving at or before this time counts as on time.
    pub due_at: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_conversion_floors_and_centers() {
        assert_eq!(world_to_cell(WorldPos::new(49.9, 50.0), 25.0), GridPos::new(1, 2));
        assert_eq!(world_to_cell(WorldPos::new(-0.1, 0.0), 25.0), GridPos::new(-1, 0));
        let center = cell_center(GridPos::new(2, 3), 25.0);
        assert_eq!(center, WorldPos::new(62.5, 87.5));
        assert_eq!(world_to_cell(center, 25.0), GridPos::new(2, 3));
    }
}
