use std::fmt;

/// Which user-facing input a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    Latitude,
    Longitude,
    City,
}

impl InputField {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputField::Latitude => "latitude",
            InputField::Longitude => "longitude",
            InputField::City => "city",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote service a transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Forecast,
    Geocoding,
    IpLocation,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Service::Forecast => "data",
            Service::Geocoding => "coordinates",
            Service::IpLocation => "location",
        })
    }
}

/// Every failure a lookup can surface to the user.
///
/// None of these are retried. The controller turns each into a status
/// message; the auto-locate race swallows provider-level transport errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeatherError {
    /// Bad or missing user input. `reason` is shown verbatim.
    #[error("{reason}")]
    Validation { field: InputField, reason: String },

    #[error("No results for '{query}'")]
    NotFound { query: String },

    #[error("Failed to fetch {service}: {cause}")]
    Transport { service: Service, cause: String },
}

impl WeatherError {
    pub fn validation(field: InputField, reason: impl Into<String>) -> Self {
        WeatherError::Validation { field, reason: reason.into() }
    }

    pub fn transport(service: Service, cause: impl fmt::Display) -> Self {
        WeatherError::Transport { service, cause: cause.to_string() }
    }

    /// Short status line for the sidebar, distinct from the full message.
    pub fn status_line(&self) -> String {
        match self {
            WeatherError::Validation { reason, .. } => reason.clone(),
            WeatherError::NotFound { .. } => self.to_string(),
            WeatherError::Transport { service: Service::Geocoding, .. } => {
                "Geocoding error".to_string()
            }
            WeatherError::Transport { .. } => "Network error".to_string(),
        }
    }
}

/// Keep error bodies readable in a single status line.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
