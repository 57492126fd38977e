use crate::feed_interface::classify::{classify_status, Category, StatusLevel};
use std::collections::BTreeMap;

/// Geographic position of a record. Latitude and longitude always travel together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("non-finite coordinate ({0}, {1})")]
    NonFinite(f64, f64),
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite(latitude, longitude));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// One item of a feed response.
///
/// Records are built once at the ingestion boundary and never mutated; a
/// refresh replaces the whole list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Option<String>,
    display_name: String,
    status: String,
    status_level: StatusLevel,
    category: Category,
    coordinate: Option<Coordinate>,
    free_text: BTreeMap<String, String>,
}

impl Record {
    pub fn new(
        display_name: impl Into<String>,
        status: impl Into<String>,
        category: Category,
    ) -> Self {
        let status = status.into();
        Self {
            id: None,
            display_name: display_name.into(),
            status_level: classify_status(category, &status),
            status,
            category,
            coordinate: None,
            free_text: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.id = if id.trim().is_empty() { None } else { Some(id) };
        self
    }

    pub fn with_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.free_text.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn status_level(&self) -> StatusLevel {
        self.status_level
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.free_text.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.free_text
    }

    /// Feed-scoped identity: the id when present, otherwise a key built from
    /// category, name and position.
    pub fn identity(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        match self.coordinate {
            Some(coordinate) => format!(
                "{}:{}@{:.5},{:.5}",
                self.category,
                self.display_name,
                coordinate.latitude(),
                coordinate.longitude()
            ),
            None => format!("{}:{}", self.category, self.display_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_classifies_status_on_construction() {
        let record = Record::new("Sirene A", "acionada", Category::Siren).with_id("s1");
        assert_eq!(record.status_level(), StatusLevel::Critical);
        assert_eq!(record.identity(), "s1");
    }

    #[test]
    fn identity_falls_back_to_fields() {
        let coordinate = Coordinate::new(-22.97, -43.18).unwrap();
        let record = Record::new("Copacabana", "própria", Category::Beach)
            .with_id("  ")
            .with_coordinate(coordinate);
        assert_eq!(record.id(), None);
        assert_eq!(record.identity(), "beach:Copacabana@-22.97000,-43.18000");

        let bare = Record::new("Cristo Redentor", "aberto", Category::TouristPoint);
        assert_eq!(bare.identity(), "tourist-point:Cristo Redentor");
    }

    #[test]
    fn coordinate_rejects_out_of_range_values() {
        assert_eq!(
            Coordinate::new(91.0, 0.0),
            Err(CoordinateError::LatitudeOutOfRange(91.0))
        );
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }
}
