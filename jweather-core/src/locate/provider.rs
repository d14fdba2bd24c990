use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{
    error::{Service, WeatherError},
    model::{Coordinate, IpLocationGuess},
};

pub const DEFAULT_IP_LOOKUP_TIMEOUT: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpProviderId {
    IpApi,
    IpInfo,
    IfConfig,
    IpWhoIs,
}

impl IpProviderId {
    pub fn as_str(&self) -> &'static str {
        self.entry().name
    }

    pub fn url(&self) -> &'static str {
        self.entry().url
    }

    /// Map a provider's raw JSON into the common guess shape.
    pub fn normalize(&self, info: &Value) -> IpLocationGuess {
        (self.entry().normalize)(info)
    }

    pub const fn all() -> &'static [IpProviderId] {
        &[IpProviderId::IpApi, IpProviderId::IpInfo, IpProviderId::IfConfig, IpProviderId::IpWhoIs]
    }

    fn entry(&self) -> &'static ProviderEntry {
        match self {
            IpProviderId::IpApi => &PROVIDERS[0],
            IpProviderId::IpInfo => &PROVIDERS[1],
            IpProviderId::IfConfig => &PROVIDERS[2],
            IpProviderId::IpWhoIs => &PROVIDERS[3],
        }
    }
}

impl fmt::Display for IpProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for IpProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        PROVIDERS
            .iter()
            .find(|entry| entry.name == lower)
            .map(|entry| entry.id)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown location provider '{value}'. Supported providers: ipapi, ipinfo, ifconfig, ipwhois."
                )
            })
    }
}

struct ProviderEntry {
    id: IpProviderId,
    name: &'static str,
    url: &'static str,
    normalize: fn(&Value) -> IpLocationGuess,
}

static PROVIDERS: [ProviderEntry; 4] = [
    ProviderEntry {
        id: IpProviderId::IpApi,
        name: "ipapi",
        url: "https://ipapi.co/json/",
        normalize: normalize_flat,
    },
    ProviderEntry {
        id: IpProviderId::IpInfo,
        name: "ipinfo",
        url: "https://ipinfo.io/json",
        normalize: normalize_loc,
    },
    ProviderEntry {
        id: IpProviderId::IfConfig,
        name: "ifconfig",
        url: "https://ifconfig.co/json",
        normalize: normalize_flat,
    },
    ProviderEntry {
        id: IpProviderId::IpWhoIs,
        name: "ipwhois",
        url: "https://ipwho.is/",
        normalize: normalize_flat,
    },
];

/// Separate `latitude`/`longitude` (or `lat`/`lon`) fields.
fn normalize_flat(info: &Value) -> IpLocationGuess {
    let lat = number_field(info, &["latitude", "lat"]);
    let lon = number_field(info, &["longitude", "lon"]);

    IpLocationGuess { city: text_field(info, &["city", "city_name"]), coordinate: coordinate(lat, lon) }
}

/// A combined `loc: "lat,lon"` field, falling back to the flat shape.
fn normalize_loc(info: &Value) -> IpLocationGuess {
    let from_loc = info.get("loc").and_then(Value::as_str).and_then(|loc| {
        let (lat, lon) = loc.split_once(',')?;
        coordinate(lat.trim().parse().ok(), lon.trim().parse().ok())
    });

    let mut guess = normalize_flat(info);
    if from_loc.is_some() {
        guess.coordinate = from_loc;
    }
    guess
}

/// `success: false` (ipwho.is) or `error: true` (ipapi.co) mark an unusable body.
pub(crate) fn declares_failure(info: &Value) -> bool {
    info.get("success").and_then(Value::as_bool) == Some(false)
        || info.get("error").and_then(Value::as_bool) == Some(true)
}

fn text_field(info: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| info.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Some providers send coordinates as strings.
fn number_field(info: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match info.get(*k)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn coordinate(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinate> {
    Coordinate::new(lat?, lon?).ok()
}

/// One participant in the auto-locate race.
#[async_trait]
pub trait IpLocator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn locate(&self) -> Result<IpLocationGuess, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct HttpIpLocator {
    id: IpProviderId,
    url: String,
    http: Client,
}

impl HttpIpLocator {
    pub fn new(id: IpProviderId, timeout: Duration) -> Result<Self, WeatherError> {
        Self::with_url(id, id.url(), timeout)
    }

    pub fn with_url(id: IpProviderId, url: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| WeatherError::transport(Service::IpLocation, e))?;

        Ok(Self { id, url: url.into(), http })
    }
}

/// Build one HTTP locator per configured provider.
pub fn locators_for(ids: &[IpProviderId], timeout: Duration) -> Result<Vec<Arc<dyn IpLocator>>, WeatherError> {
    ids.iter()
        .map(|id| HttpIpLocator::new(*id, timeout).map(|l| Arc::new(l) as Arc<dyn IpLocator>))
        .collect()
}

#[async_trait]
impl IpLocator for HttpIpLocator {
    fn name(&self) -> &str {
        self.id.as_str()
    }

    async fn locate(&self) -> Result<IpLocationGuess, WeatherError> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| WeatherError::transport(Service::IpLocation, e))?;

        if res.status() != StatusCode::OK {
            return Err(WeatherError::transport(
                Service::IpLocation,
                format!("{} answered with status {}", self.id, res.status()),
            ));
        }

        let info: Value = res
            .json()
            .await
            .map_err(|e| WeatherError::transport(Service::IpLocation, e))?;

        if declares_failure(&info) {
            return Err(WeatherError::transport(
                Service::IpLocation,
                format!("{} reported failure", self.id),
            ));
        }

        Ok(self.id.normalize(&info))
    }
}
