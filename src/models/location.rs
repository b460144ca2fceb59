use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EntityId;

/// Saved service address, maps to `locations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: EntityId,
    pub user_id: EntityId,
    pub city: String,
    pub district: String,
    pub neighborhood: String,
    pub address: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// Body of an add or update request
///
/// Missing coordinates resolve to the city center, see
/// [`LocationInput::coordinates`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub city: String,
    pub district: String,
    #[serde(default)]
    pub neighborhood: Option<String>,
    /// Free-form street address
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Approximate centers of the larger service cities
const CITY_CENTERS: &[(&str, f64, f64)] = &[
    ("istanbul", 41.0082, 28.9784),
    ("ankara", 39.9334, 32.8597),
    ("izmir", 38.4237, 27.1428),
    ("bursa", 40.1885, 29.0610),
    ("antalya", 36.8969, 30.7133),
    ("adana", 37.0000, 35.3213),
    ("konya", 37.8746, 32.4932),
    ("gaziantep", 37.0662, 37.3833),
];

/// Unknown cities fall back to the first entry
fn city_center(city: &str) -> (f64, f64) {
    let key: String = city
        .trim()
        .chars()
        .map(|c| match c {
            'İ' | 'I' | 'ı' => 'i',
            'Ş' | 'ş' => 's',
            'Ğ' | 'ğ' => 'g',
            'Ü' | 'ü' => 'u',
            'Ö' | 'ö' => 'o',
            'Ç' | 'ç' => 'c',
            other => other.to_ascii_lowercase(),
        })
        .collect();

    let (_, lat, lng) = CITY_CENTERS
        .iter()
        .find(|(name, _, _)| *name == key)
        .unwrap_or(&CITY_CENTERS[0]);
    (*lat, *lng)
}

impl LocationInput {
    /// Given coordinates, each falling back to the city center independently
    pub fn coordinates(&self) -> (f64, f64) {
        let (lat, lng) = city_center(&self.city);
        (self.latitude.unwrap_or(lat), self.longitude.unwrap_or(lng))
    }

    pub fn neighborhood_or_empty(&self) -> String {
        self.neighborhood.clone().unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        !self.city.trim().is_empty() && !self.district.trim().is_empty()
    }

    /// Overwrite the editable fields of a stored location; coordinates only
    /// change when given
    pub fn apply_to(&self, location: &mut Location) {
        location.city = self.city.clone();
        location.district = self.district.clone();
        location.neighborhood = self.neighborhood_or_empty();
        location.address = self.details.clone();
        location.is_default = self.is_default;
        location.latitude = self.latitude.unwrap_or(location.latitude);
        location.longitude = self.longitude.unwrap_or(location.longitude);
    }
}
