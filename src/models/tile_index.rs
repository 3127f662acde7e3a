use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tile file name -> labels of the layers whose folder holds that file.
///
/// Keys keep the order they were added in, and so do the labels under each key, so the
/// serialized index is identical for identical folders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileIndex(IndexMap<String, Vec<String>>);

impl TileIndex {
    pub fn with_targets<I>(file_names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        TileIndex(file_names.into_iter().map(|name| (name, Vec::new())).collect())
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.0.contains_key(file_name)
    }

    /// Appends `label` under `file_name`. Names outside the index are ignored.
    pub fn record(&mut self, file_name: &str, label: &str) -> bool {
        match self.0.get_mut(file_name) {
            Some(labels) => {
                labels.push(label.to_string());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&[String]> {
        self.0.get(file_name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, labels)| (name.as_str(), labels.as_slice()))
    }

    /// Newest year layer no later than `year` that has `file_name`, the same fallback the map
    /// viewer does when a year has no tile of its own.
    pub fn latest_at_or_before(&self, file_name: &str, year: u16) -> Option<&str> {
        self.get(file_name)?
            .iter()
            .filter_map(|label| label.parse::<u16>().ok().map(|y| (y, label)))
            .filter(|(y, _)| *y <= year)
            .max_by_key(|(y, _)| *y)
            .map(|(_, label)| label.as_str())
    }
}
