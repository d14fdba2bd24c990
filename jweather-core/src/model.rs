use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{error::WeatherError, validate};

/// Placeholder shown wherever the provider left a field out.
pub const UNAVAILABLE: &str = "—";

/// A latitude/longitude pair that has passed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        validate::check_latitude(latitude)?;
        validate::check_longitude(longitude)?;
        Ok(Self::from_checked(latitude, longitude))
    }

    pub(crate) fn from_checked(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// First geocoding match for a free-text place name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub coordinate: Coordinate,
    pub name: String,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl GeocodeResult {
    /// "Name, Region, Country" with empty parts skipped.
    pub fn label(&self) -> String {
        [Some(self.name.as_str()), self.region.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What an IP geolocation provider told us about where we are.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IpLocationGuess {
    pub city: Option<String>,
    pub coordinate: Option<Coordinate>,
}

impl IpLocationGuess {
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.coordinate.is_none()
    }
}

/// Hourly series. `time` and `temperature` are aligned by index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hourly {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default, rename = "temperature_2m")]
    pub temperature: Vec<Option<f64>>,
}

/// Daily series. All vectors are aligned by index with `time`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Daily {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default, rename = "temperature_2m_max")]
    pub temperature_max: Vec<Option<f64>>,
    #[serde(default, rename = "temperature_2m_min")]
    pub temperature_min: Vec<Option<f64>>,
}

impl Daily {
    pub fn is_empty(&self) -> bool {
        self.temperature_max.is_empty() || self.temperature_min.is_empty()
    }
}

pub type Units = BTreeMap<String, String>;

/// Everything one forecast call returned for one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherBundle {
    pub coordinate: Coordinate,
    pub current: BTreeMap<String, serde_json::Value>,
    pub current_units: Units,
    pub hourly: Hourly,
    pub hourly_units: Units,
    pub daily: Daily,
    pub daily_units: Units,
}

/// A single "current" value, or the fact that it was not sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<'a> {
    Number(f64),
    Text(&'a str),
    Unavailable,
}

impl Reading<'_> {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Reading::Unavailable)
    }
}

impl fmt::Display for Reading<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(v) => write!(f, "{v}"),
            Reading::Text(s) => f.write_str(s),
            Reading::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

impl WeatherBundle {
    pub fn reading(&self, field: &str) -> Reading<'_> {
        match self.current.get(field) {
            Some(serde_json::Value::Number(n)) => {
                n.as_f64().map(Reading::Number).unwrap_or(Reading::Unavailable)
            }
            Some(serde_json::Value::String(s)) => Reading::Text(s),
            Some(serde_json::Value::Bool(b)) => Reading::Number(if *b { 1.0 } else { 0.0 }),
            _ => Reading::Unavailable,
        }
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.reading(field).as_f64()
    }

    pub fn current_unit<'a>(&'a self, field: &str, fallback: &'a str) -> &'a str {
        unit(&self.current_units, field, fallback)
    }

    pub fn hourly_unit<'a>(&'a self, field: &str, fallback: &'a str) -> &'a str {
        unit(&self.hourly_units, field, fallback)
    }

    pub fn daily_unit<'a>(&'a self, field: &str, fallback: &'a str) -> &'a str {
        unit(&self.daily_units, field, fallback)
    }

    /// Local observation time of the "current" block, e.g. `2024-06-01T14:15`.
    pub fn observed_at(&self) -> Option<&str> {
        match self.reading("time") {
            Reading::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn unit<'a>(units: &'a Units, field: &str, fallback: &'a str) -> &'a str {
    units.get(field).map(String::as_str).unwrap_or(fallback)
}
