use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::models::layer::LayerId;
use crate::models::resource::layer_dir;
use crate::models::tile::fetch_coordinates;
use crate::models::tile_index::TileIndex;

/// Scans the layer folders under `store_root` and records, for every tile name that gets
/// downloaded, which of the year folders `0001..=layer_count` hold it.
///
/// Only names from the download grid are reported on, and every one of them is a key even if
/// no folder has it. Folders that don't exist are skipped.
pub fn build_index(store_root: &Path, layer_count: u16, include_background: bool) -> TileIndex {
    let mut index = TileIndex::with_targets(fetch_coordinates().map(|coord| coord.file_name()));
    info!(
        tiles = index.len(),
        layers = layer_count,
        "searching layer folders for tiles"
    );

    if include_background {
        scan_layer(&mut index, store_root, LayerId::Background);
    }
    for year in 1..=layer_count {
        scan_layer(&mut index, store_root, LayerId::Year(year));
        if year % 100 == 0 || year == layer_count {
            info!("checked {}/{} layer folders", year, layer_count);
        }
    }
    index
}

fn scan_layer(index: &mut TileIndex, store_root: &Path, layer: LayerId) {
    let dir = layer_dir(store_root, layer);
    if !dir.is_dir() {
        return;
    }
    let label = layer.folder_name();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to read layer folder entry");
                continue;
            }
        };
        if let Some(file_name) = entry.file_name().to_str() {
            index.record(file_name, &label);
        }
    }
}

/// Builds the index and writes it as JSON to `path`.
pub fn dump_tile_index(
    store_root: &Path,
    layer_count: u16,
    include_background: bool,
    path: &Path,
) -> Result<()> {
    let index = build_index(store_root, layer_count, include_background);
    let found = index.iter().filter(|(_, labels)| !labels.is_empty()).count();
    info!(
        "writing {} tile names ({} found in at least one layer) to {}",
        index.len(),
        found,
        path.display()
    );
    write_tile_index(&index, path)
}

pub fn write_tile_index(index: &TileIndex, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create tile index file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    index
        .serialize(&mut serializer)
        .context("failed to serialize tile index")?;
    writer
        .flush()
        .with_context(|| format!("failed to write tile index file {}", path.display()))?;
    Ok(())
}
