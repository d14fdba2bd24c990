//! Coordinate validation. Runs before any network call.

use crate::{
    error::{InputField, WeatherError},
    model::Coordinate,
};

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Parse raw latitude/longitude text into a [`Coordinate`].
///
/// Latitude is checked first, so a request with two bad fields reports the
/// latitude problem.
pub fn parse_coordinate(latitude: &str, longitude: &str) -> Result<Coordinate, WeatherError> {
    let lat = parse_number(latitude, InputField::Latitude)?;
    check_latitude(lat)?;
    let lon = parse_number(longitude, InputField::Longitude)?;
    check_longitude(lon)?;
    Ok(Coordinate::from_checked(lat, lon))
}

pub(crate) fn check_latitude(value: f64) -> Result<f64, WeatherError> {
    check_range(value, LATITUDE_RANGE, InputField::Latitude)
}

pub(crate) fn check_longitude(value: f64) -> Result<f64, WeatherError> {
    check_range(value, LONGITUDE_RANGE, InputField::Longitude)
}

fn parse_number(raw: &str, field: InputField) -> Result<f64, WeatherError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| WeatherError::validation(field, format!("{} must be a number", label(field))))
}

fn check_range(value: f64, (min, max): (f64, f64), field: InputField) -> Result<f64, WeatherError> {
    // NaN fails `contains`, infinities fall outside the bounds.
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(WeatherError::validation(
            field,
            format!("{} must be between {min} and {max}", label(field)),
        ))
    }
}

fn label(field: InputField) -> &'static str {
    match field {
        InputField::Latitude => "Latitude",
        InputField::Longitude => "Longitude",
        InputField::City => "City",
    }
}
