//! City records and the fixed seed set.

use serde::{Deserialize, Serialize};

/// Name of the single table in the city store.
pub const TABLE_NAME: &str = "city_stats";

/// One row of `city_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Unique key
    pub city_name: String,
    pub population: i64,
    pub state: String,
}

impl CityRecord {
    pub fn new(city_name: impl Into<String>, population: i64, state: impl Into<String>) -> Self {
        Self {
            city_name: city_name.into(),
            population,
            state: state.into(),
        }
    }
}

/// The six cities every store is seeded with: (city_name, population, state).
pub const SEED_CITIES: [(&str, i64, &str); 6] = [
    ("New York City", 8_336_817, "New York"),
    ("Los Angeles", 3_822_238, "California"),
    ("Chicago", 2_665_039, "Illinois"),
    ("Houston", 2_302_878, "Texas"),
    ("Miami", 449_514, "Florida"),
    ("Seattle", 749_256, "Washington"),
];

/// Seed set as owned records.
pub fn seed_records() -> Vec<CityRecord> {
    SEED_CITIES
        .iter()
        .map(|(name, population, state)| CityRecord::new(*name, *population, *state))
        .collect()
}
