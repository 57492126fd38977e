use crate::feed_interface::classify::Category;
use crate::feed_interface::feed::Feed;
use crate::feed_interface::record::{Coordinate, Record};
use crate::prelude::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record as published on the wire by the operations-center API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

/// Body of a `GET /feeds/{feed}` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedResponse {
    pub feed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub records: Vec<WireRecord>,
}

impl WireRecord {
    /// Converts into a [`Record`], classifying the status and validating the position.
    pub fn into_record(self, fallback: Category) -> FetchResult<Record> {
        let category = self
            .category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or(fallback);

        let coordinate = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon).map_err(|err| {
                FetchError::DecodeError(format!("record {:?}: {}", self.name, err))
            })?),
            (None, None) => None,
            _ => {
                return Err(FetchError::DecodeError(format!(
                    "record {:?} has only one of latitude/longitude",
                    self.name
                )))
            }
        };

        let mut record = Record::new(self.name, self.status, category);
        if let Some(id) = self.id {
            record = record.with_id(id);
        }
        if let Some(coordinate) = coordinate {
            record = record.with_coordinate(coordinate);
        }
        for (name, value) in self.fields {
            record = record.with_field(name, value);
        }
        Ok(record)
    }
}

impl FeedResponse {
    /// Validates the response against the requested feed and converts every record.
    pub fn into_records(self, feed_id: &str) -> FetchResult<Vec<Record>> {
        if !self.feed.eq_ignore_ascii_case(feed_id) {
            return Err(FetchError::DecodeError(format!(
                "requested feed {} but response is for {}",
                feed_id, self.feed
            )));
        }
        let fallback = feed_id
            .parse::<Feed>()
            .map(Feed::default_category)
            .unwrap_or(Category::Other);
        self.records
            .into_iter()
            .map(|record| record.into_record(fallback))
            .collect()
    }
}

/// Decodes a raw response body for `feed_id`.
///
/// An empty body is a decode failure; a well-formed response with no records
/// is a successful empty list.
pub fn decode_feed_body(feed_id: &str, body: &[u8]) -> FetchResult<Vec<Record>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::DecodeError("empty response body".into()));
    }
    let response: FeedResponse = serde_json::from_slice(body)
        .map_err(|err| FetchError::DecodeError(err.to_string()))?;
    response.into_records(feed_id)
}
