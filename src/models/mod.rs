pub mod layer;
pub mod resource;
pub mod tile;
pub mod tile_index;
