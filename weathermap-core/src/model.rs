use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A clicked point on the map, as posted by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reverse geocoding query in the `"<lat>, <lon>"` form.
    pub fn geocode_query(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

/// Append-only record of every coordinate received during one run.
///
/// Serialized as a plain JSON array of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordinateLog {
    entries: Vec<Coordinate>,
}

impl CoordinateLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a coordinate and return the entry just stored.
    pub fn push(&mut self, coordinate: Coordinate) -> &Coordinate {
        self.entries.push(coordinate);
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Coordinate] {
        &self.entries
    }

    /// Write the log as a JSON array, replacing whatever was at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize coordinate log")?;

        fs::write(path, json)
            .with_context(|| format!("Failed to write coordinate log: {}", path.display()))?;

        Ok(())
    }
}

/// Reverse-geocoded location; any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Place {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Place {
    pub fn new(
        city: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self { city: city.into(), state: state.into(), country: country.into() }
    }

    /// Comma-joined label that skips empty components.
    pub fn label(&self) -> String {
        [self.city.as_str(), self.state.as_str(), self.country.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Current conditions at a coordinate. Temperatures are in Kelvin.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature_k: f64,
    pub feels_like_k: f64,
    pub humidity_pct: u8,
    pub description: String,
    pub wind_speed_mps: Option<f64>,
    /// Epoch seconds shifted by the location's UTC offset.
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
}
