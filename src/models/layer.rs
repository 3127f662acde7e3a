use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use thiserror::Error;

pub const BACKGROUND_FOLDER: &str = "back";
pub const YEAR_RANGE: RangeInclusive<u16> = 1..=2022;
/// Years that fit a four digit folder name.
pub const FOLDER_YEARS: RangeInclusive<u16> = 1..=9999;

/// A full overlay of the tile grid: the static background or one historical year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Background,
    Year(u16),
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid layer `{0}`: expected `back` or a year from 1 to 9999")]
pub struct ParseLayerError(String);

impl LayerId {
    pub fn folder_name(&self) -> String {
        match self {
            LayerId::Background => BACKGROUND_FOLDER.to_string(),
            LayerId::Year(year) => year_label(*year),
        }
    }

    /// Path prefix of this layer's tiles on the CDN, up to the `Z{zoom}` part.
    pub fn url_segment(&self) -> String {
        match self {
            LayerId::Background => "plain_".to_string(),
            LayerId::Year(year) => format!("tiles/area_{}_", year),
        }
    }
}

/// Zero-padded folder name for a year layer, as used on disk and in the tile index.
pub fn year_label(year: u16) -> String {
    format!("{:04}", year)
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.folder_name())
    }
}

impl FromStr for LayerId {
    type Err = ParseLayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            BACKGROUND_FOLDER | "background" => Ok(LayerId::Background),
            _ => s
                .parse::<u16>()
                .ok()
                .filter(|year| FOLDER_YEARS.contains(year))
                .map(LayerId::Year)
                .ok_or_else(|| ParseLayerError(s.to_string())),
        }
    }
}
