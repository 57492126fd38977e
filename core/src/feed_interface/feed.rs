use crate::feed_interface::classify::Category;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Feeds published by the operations center.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Feed {
    Alerts,
    WeatherStations,
    Traffic,
    Sirens,
    TouristPoints,
    Beaches,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown feed id: {0}")]
pub struct FeedParseError(pub String);

impl Feed {
    pub const ALL: [Feed; 6] = [
        Feed::Alerts,
        Feed::WeatherStations,
        Feed::Traffic,
        Feed::Sirens,
        Feed::TouristPoints,
        Feed::Beaches,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Feed::Alerts => "alerts",
            Feed::WeatherStations => "weather-stations",
            Feed::Traffic => "traffic",
            Feed::Sirens => "sirens",
            Feed::TouristPoints => "tourist-points",
            Feed::Beaches => "beaches",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Feed::Alerts => "Alerts",
            Feed::WeatherStations => "Weather stations",
            Feed::Traffic => "Traffic",
            Feed::Sirens => "Sirens",
            Feed::TouristPoints => "Tourist points",
            Feed::Beaches => "Beaches",
        }
    }

    /// Category assigned to records that do not carry one on the wire.
    pub fn default_category(self) -> Category {
        match self {
            Feed::Alerts => Category::Alert,
            Feed::WeatherStations => Category::WeatherStation,
            Feed::Traffic => Category::Traffic,
            Feed::Sirens => Category::Siren,
            Feed::TouristPoints => Category::TouristPoint,
            Feed::Beaches => Category::Beach,
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Feed {
    type Err = FeedParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Feed::ALL
            .into_iter()
            .find(|feed| feed.id().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FeedParseError(value.to_string()))
    }
}
