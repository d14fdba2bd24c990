//! Forward geocoding: free-text place name to the single best match.
//! Uses the Open-Meteo geocoding API (no key required).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{InputField, Service, WeatherError, truncate_body},
    model::{Coordinate, GeocodeResult},
};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";
pub const DEFAULT_GEOCODING_TIMEOUT: Duration = Duration::from_secs(6);

#[async_trait]
pub trait PlaceLookup: Send + Sync + std::fmt::Debug {
    async fn search(&self, name: &str) -> Result<GeocodeResult, WeatherError>;
}

/// Trim a user-entered place name, rejecting empty input before any request.
pub fn normalize_place_name(name: &str) -> Result<&str, WeatherError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(WeatherError::validation(InputField::City, "Enter a city name"));
    }
    Ok(trimmed)
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    http: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| WeatherError::transport(Service::Geocoding, e))?;

        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Absent or `null` when nothing matched.
    #[serde(default)]
    results: Option<Vec<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    name: String,
    admin1: Option<String>,
    country: Option<String>,
}

#[async_trait]
impl PlaceLookup for Geocoder {
    async fn search(&self, name: &str) -> Result<GeocodeResult, WeatherError> {
        let query = normalize_place_name(name)?;
        let url = format!("{}/v1/search", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("name", query), ("count", "1"), ("language", "en"), ("format", "json")])
            .send()
            .await
            .map_err(|e| WeatherError::transport(Service::Geocoding, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::transport(Service::Geocoding, e))?;

        if !status.is_success() {
            return Err(WeatherError::transport(
                Service::Geocoding,
                format!("status {}: {}", status, truncate_body(&body)),
            ));
        }

        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::transport(Service::Geocoding, format!("malformed response: {e}"))
        })?;

        let Some(hit) = parsed.results.unwrap_or_default().into_iter().next() else {
            tracing::info!(query, "geocoding returned no results");
            return Err(WeatherError::NotFound { query: query.to_string() });
        };

        let coordinate = Coordinate::new(hit.latitude, hit.longitude).map_err(|e| {
            WeatherError::transport(Service::Geocoding, format!("malformed response: {e}"))
        })?;

        let result = GeocodeResult {
            coordinate,
            name: hit.name,
            region: hit.admin1,
            country: hit.country,
        };
        tracing::info!(query, label = %result.label(), %coordinate, "geocoded");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        for name in ["", "   ", "\t\n"] {
            let err = normalize_place_name(name).unwrap_err();
            assert!(matches!(err, WeatherError::Validation { field: InputField::City, .. }));
        }
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(normalize_place_name("  Oslo ").expect("valid"), "Oslo");
    }

    #[test]
    fn missing_results_key_parses_as_empty() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"generationtime_ms": 0.5}"#).expect("parse");
        assert!(parsed.results.unwrap_or_default().is_empty());
    }

    #[test]
    fn null_results_parse_as_empty() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"results": null}"#).expect("parse");
        assert!(parsed.results.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn blank_name_fails_without_network() {
        // Port 9 is discard; a request would fail with a transport error instead.
        let geocoder = Geocoder::new("http://127.0.0.1:9", DEFAULT_GEOCODING_TIMEOUT).expect("client");
        let err = geocoder.search("  ").await.unwrap_err();
        assert!(matches!(err, WeatherError::Validation { .. }));
    }
}
