//! Core library for the `jweather` lookup app.
//!
//! This crate defines:
//! - Coordinate validation and the shared data model
//! - Clients for the Open-Meteo forecast and geocoding services
//! - The IP-geolocation auto-locate race
//! - The controller that owns application state and sequences fetches
//! - Configuration handling
//!
//! It is used by `jweather-cli`, but any front-end implementing
//! [`Presenter`] can drive the [`Controller`].

pub mod config;
pub mod controller;
pub mod error;
pub mod forecast;
pub mod geocode;
pub mod insight;
pub mod locate;
pub mod model;
pub mod validate;

pub use config::Config;
pub use controller::{Controller, FetchRequest, InputFields, Presenter, Services};
pub use error::{InputField, Service, WeatherError};
pub use forecast::{FieldSet, ForecastClient, ForecastSource};
pub use geocode::{Geocoder, PlaceLookup};
pub use locate::{IpLocator, IpProviderId, RaceWinner};
pub use model::{Coordinate, GeocodeResult, IpLocationGuess, Reading, WeatherBundle};
pub use validate::parse_coordinate;

pub(crate) const USER_AGENT: &str = concat!("jweather/", env!("CARGO_PKG_VERSION"));
