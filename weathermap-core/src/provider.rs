use crate::{
    Config,
    error::WeatherError,
    model::{Coordinate, WeatherReading},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions at `coordinate`.
    async fn current(&self, coordinate: Coordinate) -> Result<WeatherReading, WeatherError>;
}

/// Construct the OpenWeather provider from config, resolving the API key.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.resolve_api_key()?;

    let provider =
        OpenWeatherProvider::new(config.weather_base_url.clone(), api_key, config.http_timeout())?;

    Ok(Box::new(provider))
}
