use std::fmt;
use std::ops::RangeInclusive;

/// Zoom levels the CDN publishes tiles for. Only `FETCH_ZOOMS` are downloaded and indexed.
pub const ZOOM_LEVELS: RangeInclusive<u8> = 1..=6;
pub const FETCH_ZOOMS: RangeInclusive<u8> = 1..=3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn file_name(&self) -> String {
        format!("Z{}_{}_{}.png", self.zoom, self.x, self.y)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z{}_{}_{}", self.zoom, self.x, self.y)
    }
}

/// Number of tiles along one edge of the grid at `zoom`.
pub fn edge_len(zoom: u8) -> u32 {
    2_u32.pow(zoom as u32)
}

/// Every tile of the `zoom` grid, x outer and y inner.
pub fn coordinates_for_zoom(zoom: u8) -> impl Iterator<Item = TileCoord> + Clone {
    debug_assert!(ZOOM_LEVELS.contains(&zoom), "no tiles published at zoom {}", zoom);
    let edge = edge_len(zoom);
    (0..edge).flat_map(move |x| (0..edge).map(move |y| TileCoord { zoom, x, y }))
}

/// Every tile that gets downloaded or indexed, zoom ascending.
pub fn fetch_coordinates() -> impl Iterator<Item = TileCoord> + Clone {
    FETCH_ZOOMS.flat_map(coordinates_for_zoom)
}
