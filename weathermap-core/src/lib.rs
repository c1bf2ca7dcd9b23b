//! Core library for the `weathermap` tool.
//!
//! This crate defines:
//! - Map document generation and the textual patch that wires map clicks to a
//!   local server
//! - The callback server that receives clicks and the quit signal
//! - Reverse geocoding and weather providers, and the per-click lookup
//! - Configuration & credentials handling
//!
//! It is used by `weathermap-cli`, but the pieces can be driven on their own;
//! the callback server answers any HTTP client, not only the patched map.

pub mod browser;
pub mod config;
pub mod error;
pub mod geocode;
pub mod lookup;
pub mod map;
pub mod model;
pub mod patch;
pub mod provider;
pub mod report;
pub mod server;
pub mod units;

#[cfg(test)]
mod stub;

pub use config::Config;
pub use error::{GeocodeError, PatchError, WeatherError};
pub use geocode::{Address, Nominatim, ReverseGeocoder};
pub use lookup::WeatherLookup;
pub use model::{Coordinate, CoordinateLog, Place, WeatherReading};
pub use patch::PatchOptions;
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
pub use server::{CallbackServer, ReportSink, StdoutSink};
