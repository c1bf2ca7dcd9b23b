//! The per-click pipeline: reverse geocode, then fetch and render weather.

use tracing::{info, warn};

use crate::{
    error::GeocodeError,
    geocode::ReverseGeocoder,
    model::{Coordinate, Place},
    provider::WeatherProvider,
    report,
};

#[derive(Debug)]
pub struct WeatherLookup {
    geocoder: Box<dyn ReverseGeocoder>,
    provider: Box<dyn WeatherProvider>,
}

impl WeatherLookup {
    pub fn new(geocoder: Box<dyn ReverseGeocoder>, provider: Box<dyn WeatherProvider>) -> Self {
        Self { geocoder, provider }
    }

    /// Resolve the place at `coordinate`, or `None` if the location is invalid.
    ///
    /// Any address object the geocoder returns counts as valid, even one with
    /// no city, state or country.
    pub async fn resolve_place(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<Place>, GeocodeError> {
        match self.geocoder.reverse(&coordinate.geocode_query()).await {
            Ok(Some(address)) if !address.is_empty() => Ok(Some(address.to_place())),
            Ok(_) => {
                warn!(
                    latitude = coordinate.latitude,
                    longitude = coordinate.longitude,
                    "Location not found."
                );
                Ok(None)
            }
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "reverse geocoding failed");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Weather report for `coordinate`, or `None` when the lookup was skipped.
    pub async fn report(&self, coordinate: Coordinate) -> anyhow::Result<Option<String>> {
        let Some(place) = self.resolve_place(coordinate).await? else {
            return Ok(None);
        };

        let reading = match self.provider.current(coordinate).await {
            Ok(reading) => reading,
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "weather request failed");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        info!(location = %place, "weather received");
        Ok(Some(report::render(&place, &reading)))
    }
}
