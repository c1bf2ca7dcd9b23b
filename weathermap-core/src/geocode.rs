use std::{fmt::Debug, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{config::Config, error::GeocodeError, model::Place};

/// Raw address object returned by a reverse geocoder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Address(pub Map<String, Value>);

impl Address {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn field(&self, key: &str) -> String {
        self.0.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
    }

    /// City, state and country, each empty when the geocoder omitted it.
    pub fn to_place(&self) -> Place {
        Place::new(self.field("city"), self.field("state"), self.field("country"))
    }
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync + Debug {
    /// Look up the address at a `"<lat>, <lon>"` query.
    ///
    /// `Ok(None)` means the service answered but has nothing at that point.
    async fn reverse(&self, query: &str) -> Result<Option<Address>, GeocodeError>;
}

/// Split a `"<lat>, <lon>"` query into its two numbers.
pub fn parse_query(query: &str) -> Result<(f64, f64), GeocodeError> {
    let invalid = || GeocodeError::InvalidQuery(query.to_string());

    let (lat, lon) = query.split_once(',').ok_or_else(invalid)?;
    let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
    let lon = lon.trim().parse::<f64>().map_err(|_| invalid())?;

    Ok((lat, lon))
}

/// OpenStreetMap Nominatim reverse geocoder.
#[derive(Debug, Clone)]
pub struct Nominatim {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
    error: Option<String>,
}

impl Nominatim {
    pub fn new(base_url: String, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build geocoder HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.geocoder_base_url.clone(), &config.user_agent, config.http_timeout())
    }
}

#[async_trait]
impl ReverseGeocoder for Nominatim {
    async fn reverse(&self, query: &str) -> Result<Option<Address>, GeocodeError> {
        let (lat, lon) = parse_query(query)?;
        let url = format!("{}/reverse", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(&url)
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.to_string().as_str()),
                ("lon", lon.to_string().as_str()),
                ("addressdetails", "1"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GeocodeError::Service(format!(
                "Nominatim reverse request failed with status {status}"
            )));
        }

        let parsed: ReverseResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

        if let Some(error) = parsed.error {
            debug!(query, error = %error, "Nominatim has no result");
            return Ok(None);
        }

        Ok(parsed.address)
    }
}
