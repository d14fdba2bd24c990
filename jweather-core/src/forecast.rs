use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Service, WeatherError, truncate_body},
    model::{Coordinate, Daily, Hourly, Units, WeatherBundle},
};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_FORECAST_TIMEOUT: Duration = Duration::from_secs(7);

const FULL_CURRENT: &[&str] = &[
    "temperature_2m",
    "apparent_temperature",
    "relative_humidity_2m",
    "dew_point_2m",
    "is_day",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "cloud_cover",
    "pressure_msl",
    "surface_pressure",
    "wind_speed_10m",
    "wind_gusts_10m",
    "wind_direction_10m",
    "visibility",
    "uv_index",
];

const MINIMAL_CURRENT: &[&str] =
    &["temperature_2m", "is_day", "precipitation", "rain", "showers", "snowfall"];

/// Which set of fields a forecast request asks for, and how it is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSet {
    #[default]
    Full,
    Minimal,
}

impl FieldSet {
    pub fn current(&self) -> &'static [&'static str] {
        match self {
            FieldSet::Full => FULL_CURRENT,
            FieldSet::Minimal => MINIMAL_CURRENT,
        }
    }

    pub fn hourly(&self) -> &'static [&'static str] {
        match self {
            FieldSet::Full => &["temperature_2m"],
            FieldSet::Minimal => &[],
        }
    }

    pub fn daily(&self) -> &'static [&'static str] {
        match self {
            FieldSet::Full => &["temperature_2m_max", "temperature_2m_min"],
            FieldSet::Minimal => &[],
        }
    }
}

/// Anything that can turn a coordinate into a [`WeatherBundle`].
#[async_trait]
pub trait ForecastSource: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<WeatherBundle, WeatherError>;
}

/// Open-Meteo forecast client.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    http: Client,
    base_url: String,
    fields: FieldSet,
}

impl ForecastClient {
    pub fn new(base_url: impl Into<String>, fields: FieldSet, timeout: Duration) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| WeatherError::transport(Service::Forecast, e))?;

        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string(), fields })
    }

    pub fn fields(&self) -> FieldSet {
        self.fields
    }

    fn query(&self, coordinate: &Coordinate) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("latitude", coordinate.latitude().to_string()),
            ("longitude", coordinate.longitude().to_string()),
        ];

        for (key, list) in [
            ("current", self.fields.current()),
            ("hourly", self.fields.hourly()),
            ("daily", self.fields.daily()),
        ] {
            if !list.is_empty() {
                params.push((key, list.join(",")));
            }
        }

        params.push(("timezone", "auto".to_string()));
        params
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    current_units: Units,
    #[serde(default)]
    hourly: Hourly,
    #[serde(default)]
    hourly_units: Units,
    #[serde(default)]
    daily: Daily,
    #[serde(default)]
    daily_units: Units,
}

#[async_trait]
impl ForecastSource for ForecastClient {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<WeatherBundle, WeatherError> {
        let url = format!("{}/v1/forecast", self.base_url);
        tracing::debug!(%coordinate, fields = ?self.fields, "requesting forecast");

        let res = self
            .http
            .get(&url)
            .query(&self.query(coordinate))
            .send()
            .await
            .map_err(|e| WeatherError::transport(Service::Forecast, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::transport(Service::Forecast, e))?;

        if !status.is_success() {
            return Err(WeatherError::transport(
                Service::Forecast,
                format!("status {}: {}", status, truncate_body(&body)),
            ));
        }

        let parsed: ForecastResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::transport(Service::Forecast, format!("malformed response: {e}"))
        })?;

        tracing::info!(
            %coordinate,
            current_fields = parsed.current.len(),
            hours = parsed.hourly.time.len(),
            days = parsed.daily.time.len(),
            "forecast received"
        );

        Ok(WeatherBundle {
            coordinate: *coordinate,
            current: parsed.current.into_iter().collect(),
            current_units: parsed.current_units,
            hourly: parsed.hourly,
            hourly_units: parsed.hourly_units,
            daily: parsed.daily,
            daily_units: parsed.daily_units,
        })
    }
}
