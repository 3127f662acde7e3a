use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::models::tile_index::TileIndex;

pub fn load_tile_index(path: &Path) -> Result<TileIndex> {
    let file = File::open(path)
        .with_context(|| format!("failed to open tile index {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to deserialize tile index {}", path.display()))
}

/// Prints the folder to load `file_name` from when showing `year`.
pub fn lookup_tile(index_path: &Path, file_name: &str, year: u16) -> Result<String> {
    let index = load_tile_index(index_path)?;
    if !index.contains(file_name) {
        return Err(anyhow!("{} is not a tile name in the index", file_name));
    }
    let label = index
        .latest_at_or_before(file_name, year)
        .ok_or_else(|| anyhow!("no layer up to year {} has {}", year, file_name))?
        .to_string();
    info!(file_name, year, label = %label, "resolved tile layer");
    println!("{}/{}", label, file_name);
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_index::write_tile_index;
    use tempfile::TempDir;

    #[test]
    fn resolves_from_a_dumped_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        let mut index = TileIndex::with_targets(vec!["Z2_1_3.png".to_string()]);
        index.record("Z2_1_3.png", "0100");
        index.record("Z2_1_3.png", "0800");
        write_tile_index(&index, &path).unwrap();

        assert_eq!(lookup_tile(&path, "Z2_1_3.png", 799).unwrap(), "0100");
        assert_eq!(lookup_tile(&path, "Z2_1_3.png", 2022).unwrap(), "0800");
        assert!(lookup_tile(&path, "Z2_1_3.png", 99).is_err());
        assert!(lookup_tile(&path, "Z9_0_0.png", 2022).is_err());
    }

    #[test]
    fn missing_index_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_tile_index(&dir.path().join("list.json")).is_err());
    }
}
