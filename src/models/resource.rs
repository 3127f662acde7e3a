use std::path::{Path, PathBuf};

use super::layer::LayerId;
use super::tile::TileCoord;

/// One tile of one layer, along with where it comes from and where it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileResource {
    pub layer: LayerId,
    pub coord: TileCoord,
}

impl TileResource {
    pub fn new(layer: LayerId, coord: TileCoord) -> Self {
        Self { layer, coord }
    }

    pub fn url(&self, cdn_host: &str, cache_buster: &str) -> String {
        format!(
            "https://{host}/{segment}{tile}.png?v={v}",
            host = cdn_host,
            segment = self.layer.url_segment(),
            tile = self.coord,
            v = cache_buster
        )
    }

    pub fn local_path(&self, store_root: &Path) -> PathBuf {
        layer_dir(store_root, self.layer).join(self.coord.file_name())
    }
}

pub fn layer_dir(store_root: &Path, layer: LayerId) -> PathBuf {
    store_root.join(layer.folder_name())
}
