pub mod build_index;
pub mod download_tiles;
pub mod lookup_tile;

pub use build_index::dump_tile_index;
pub use download_tiles::{download_layer, download_tiles, DownloadContext};
pub use lookup_tile::lookup_tile;
