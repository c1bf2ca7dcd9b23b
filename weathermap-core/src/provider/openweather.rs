use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::WeatherError,
    model::{Coordinate, WeatherReading},
};

use super::WeatherProvider;

/// OpenWeather current-conditions endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build OpenWeather HTTP client")?;

        Ok(Self { base_url, api_key, http })
    }

    async fn fetch_current(&self, coordinate: Coordinate) -> Result<WeatherReading, WeatherError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", coordinate.latitude.to_string().as_str()),
                ("lon", coordinate.longitude.to_string().as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Service(format!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::Malformed(format!("Failed to parse OpenWeather JSON: {e}"))
        })?;

        parsed.into_reading()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
    #[serde(default)]
    sys: OwSys,
    /// Shift from UTC in seconds.
    timezone: Option<i64>,
}

impl OwCurrentResponse {
    fn into_reading(self) -> Result<WeatherReading, WeatherError> {
        let description = self
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| {
                WeatherError::Malformed("response contained no weather conditions".into())
            })?;

        let shifted = |ts: Option<i64>| ts.zip(self.timezone).and_then(|(t, tz)| local_time(t, tz));

        Ok(WeatherReading {
            temperature_k: self.main.temp,
            feels_like_k: self.main.feels_like,
            humidity_pct: self.main.humidity,
            description,
            wind_speed_mps: self.wind.map(|w| w.speed),
            sunrise: shifted(self.sys.sunrise),
            sunset: shifted(self.sys.sunset),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, coordinate: Coordinate) -> Result<WeatherReading, WeatherError> {
        self.fetch_current(coordinate).await
    }
}

/// Epoch seconds plus a UTC offset, as a naive wall-clock time.
fn local_time(epoch: i64, offset: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(epoch + offset, 0).map(|dt| dt.naive_utc())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
