//! Integration tests for the HTTP clients and controller using wiremock.
//!
//! Each test points the clients at a mock server, so no real service is hit.

use std::{sync::Arc, time::Duration};

use jweather_core::{
    Config, Controller, FetchRequest, ForecastSource, InputField, InputFields, IpLocator, PlaceLookup,
    Presenter, Reading, Service, Services, WeatherBundle, WeatherError,
    forecast::{DEFAULT_FORECAST_TIMEOUT, FieldSet, ForecastClient},
    geocode::{DEFAULT_GEOCODING_TIMEOUT, Geocoder},
    locate::{self, HttpIpLocator, IpProviderId},
    model::UNAVAILABLE,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a forecast body shaped like Open-Meteo's.
fn forecast_body(with_uv: bool) -> serde_json::Value {
    let mut current = json!({
        "time": "2024-06-01T14:15",
        "interval": 900,
        "temperature_2m": 24.3,
        "apparent_temperature": 25.1,
        "relative_humidity_2m": 61,
        "is_day": 1,
        "rain": 0.0,
        "snowfall": 0.0,
        "cloud_cover": 35,
        "wind_speed_10m": 11.2,
    });
    if with_uv {
        current["uv_index"] = json!(6.1);
    }

    json!({
        "latitude": 40.71,
        "longitude": -74.01,
        "timezone": "America/New_York",
        "current_units": { "temperature_2m": "°C", "relative_humidity_2m": "%", "wind_speed_10m": "km/h" },
        "current": current,
        "hourly_units": { "temperature_2m": "°C" },
        "hourly": {
            "time": ["2024-06-01T14:00", "2024-06-01T15:00"],
            "temperature_2m": [24.0, 24.8]
        },
        "daily_units": { "temperature_2m_max": "°C", "temperature_2m_min": "°C" },
        "daily": {
            "time": ["2024-06-01", "2024-06-02"],
            "temperature_2m_max": [27.2, 29.9],
            "temperature_2m_min": [17.0, 18.4]
        }
    })
}

fn geocode_body() -> serde_json::Value {
    json!({
        "results": [{
            "id": 2950159,
            "name": "Berlin",
            "latitude": 52.52437,
            "longitude": 13.41053,
            "country": "Germany",
            "admin1": "Land Berlin"
        }],
        "generationtime_ms": 0.9
    })
}

#[derive(Debug, Default)]
struct Recorder {
    errors: Vec<WeatherError>,
    rendered: Vec<WeatherBundle>,
    fields: Vec<InputFields>,
}

impl Presenter for Recorder {
    fn status(&mut self, _message: &str) {}

    fn error(&mut self, error: &WeatherError) {
        self.errors.push(error.clone());
    }

    fn fields_changed(&mut self, fields: &InputFields) {
        self.fields.push(fields.clone());
    }

    fn render(&mut self, bundle: &WeatherBundle) {
        self.rendered.push(bundle.clone());
    }
}

fn controller_for(server: &MockServer) -> Controller<Recorder> {
    let mut config = Config::default();
    config.endpoints.forecast_url = server.uri();
    config.endpoints.geocoding_url = server.uri();
    config.auto_locate.enabled = false;

    let services = Services::from_config(&config).expect("services");
    Controller::new(services, Recorder::default())
}

#[tokio::test]
async fn test_forecast_request_carries_exact_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "40.7128"))
        .and(query_param("longitude", "-74.006"))
        .and(query_param("timezone", "auto"))
        .and(query_param("hourly", "temperature_2m"))
        .and(query_param("daily", "temperature_2m_max,temperature_2m_min"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(true)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut controller = controller_for(&mock_server);
    controller.submit(FetchRequest::Coordinates {
        latitude: "40.7128".into(),
        longitude: "-74.0060".into(),
    });
    controller.run_until_idle().await;

    let rendered = &controller.presenter().rendered;
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].reading("temperature_2m"), Reading::Number(24.3));
    assert_eq!(rendered[0].hourly.temperature.len(), 2);
    assert_eq!(rendered[0].daily.temperature_max[1], Some(29.9));
    assert_eq!(controller.state().status, "Updated • 40.7128, -74.0060");
}

#[tokio::test]
async fn test_out_of_range_latitude_issues_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(true)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut controller = controller_for(&mock_server);
    controller.submit(FetchRequest::Coordinates { latitude: "95".into(), longitude: "0".into() });
    controller.run_until_idle().await;

    let errors = &controller.presenter().errors;
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        WeatherError::Validation { field, reason } => {
            assert_eq!(*field, InputField::Latitude);
            assert!(reason.contains("Latitude"), "reason should name latitude: {reason}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_city_is_not_found_and_skips_forecast() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Nowhereville123xyz"))
        .and(query_param("count", "1"))
        .and(query_param("language", "en"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "generationtime_ms": 0.4 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(true)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut controller = controller_for(&mock_server);
    controller.submit(FetchRequest::City("Nowhereville123xyz".into()));
    controller.run_until_idle().await;

    assert_eq!(
        controller.presenter().errors,
        vec![WeatherError::NotFound { query: "Nowhereville123xyz".into() }]
    );
    assert!(controller.state().last_bundle.is_none());
}

#[tokio::test]
async fn test_null_results_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Atlantis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": null })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let geocoder = Geocoder::new(mock_server.uri(), DEFAULT_GEOCODING_TIMEOUT).expect("geocoder");
    let err = geocoder.search("Atlantis").await.unwrap_err();

    assert_eq!(err, WeatherError::NotFound { query: "Atlantis".into() });
    assert_eq!(err.status_line(), "No results for 'Atlantis'");
}

#[tokio::test]
async fn test_city_lookup_fetches_resolved_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "52.52437"))
        .and(query_param("longitude", "13.41053"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(true)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut controller = controller_for(&mock_server);
    controller.submit(FetchRequest::City("Berlin".into()));
    controller.run_until_idle().await;

    let fields = &controller.state().fields;
    assert_eq!(fields.latitude, "52.524370");
    assert_eq!(fields.longitude, "13.410530");
    assert_eq!(fields.city, "Berlin");
    assert_eq!(controller.presenter().rendered.len(), 1);
}

#[tokio::test]
async fn test_geocoder_builds_label() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_body()))
        .mount(&mock_server)
        .await;

    let geocoder = Geocoder::new(mock_server.uri(), DEFAULT_GEOCODING_TIMEOUT).expect("client");
    let result = geocoder.search("  Berlin ").await.expect("result");

    assert_eq!(result.label(), "Berlin, Land Berlin, Germany");
    assert_eq!(result.coordinate.latitude(), 52.52437);
}

#[tokio::test]
async fn test_geocoder_server_error_is_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let geocoder = Geocoder::new(mock_server.uri(), DEFAULT_GEOCODING_TIMEOUT).expect("client");
    let err = geocoder.search("Berlin").await.unwrap_err();

    assert!(matches!(err, WeatherError::Transport { service: Service::Geocoding, .. }));
    assert!(err.to_string().contains("503"), "Error should mention 503 status: {err}");
}

#[tokio::test]
async fn test_missing_optional_field_reads_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(false)))
        .mount(&mock_server)
        .await;

    let client = ForecastClient::new(mock_server.uri(), FieldSet::Full, DEFAULT_FORECAST_TIMEOUT).expect("client");
    let coordinate = jweather_core::Coordinate::new(40.7128, -74.006).expect("valid");
    let bundle = client.fetch(&coordinate).await.expect("bundle");

    assert_eq!(bundle.reading("uv_index"), Reading::Unavailable);
    assert_eq!(bundle.reading("uv_index").to_string(), UNAVAILABLE);
    assert_eq!(bundle.reading("temperature_2m"), Reading::Number(24.3));
}

#[tokio::test]
async fn test_minimal_variant_requests_minimal_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("current", "temperature_2m,is_day,precipitation,rain,showers,snowfall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": { "temperature_2m": 9.5, "is_day": 0 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ForecastClient::new(mock_server.uri(), FieldSet::Minimal, DEFAULT_FORECAST_TIMEOUT).expect("client");
    let coordinate = jweather_core::Coordinate::new(59.91, 10.75).expect("valid");
    let bundle = client.fetch(&coordinate).await.expect("bundle");

    assert!(bundle.hourly.time.is_empty());
    assert!(bundle.daily.is_empty());
    assert_eq!(bundle.number("is_day"), Some(0.0));
}

#[tokio::test]
async fn test_forecast_malformed_json_is_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = ForecastClient::new(mock_server.uri(), FieldSet::Full, DEFAULT_FORECAST_TIMEOUT).expect("client");
    let coordinate = jweather_core::Coordinate::new(0.0, 0.0).expect("valid");
    let err = client.fetch(&coordinate).await.unwrap_err();

    assert!(matches!(err, WeatherError::Transport { service: Service::Forecast, .. }));
    assert!(err.to_string().contains("malformed response"));
}

#[tokio::test]
async fn test_forecast_timeout_is_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body(true))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = ForecastClient::new(mock_server.uri(), FieldSet::Full, Duration::from_millis(200)).expect("client");
    let coordinate = jweather_core::Coordinate::new(0.0, 0.0).expect("valid");
    let err = client.fetch(&coordinate).await.unwrap_err();

    assert!(matches!(err, WeatherError::Transport { service: Service::Forecast, .. }));
}

#[tokio::test]
async fn test_ip_locator_parses_loc_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.7",
            "city": "Toronto",
            "loc": "43.7001,-79.4163"
        })))
        .mount(&mock_server)
        .await;

    let locator = HttpIpLocator::with_url(
        IpProviderId::IpInfo,
        format!("{}/json", mock_server.uri()),
        Duration::from_secs(2),
    )
    .expect("locator");
    let guess = locator.locate().await.expect("guess");

    assert_eq!(guess.city.as_deref(), Some("Toronto"));
    let c = guess.coordinate.expect("coordinate");
    assert_eq!((c.latitude(), c.longitude()), (43.7001, -79.4163));
}

#[tokio::test]
async fn test_ip_locator_rejects_declared_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Reserved range"
        })))
        .mount(&mock_server)
        .await;

    let locator = HttpIpLocator::with_url(IpProviderId::IpWhoIs, mock_server.uri(), Duration::from_secs(2))
        .expect("locator");
    let err = locator.locate().await.unwrap_err();
    assert!(matches!(err, WeatherError::Transport { service: Service::IpLocation, .. }));
}

#[tokio::test]
async fn test_race_takes_first_responder_over_http() {
    let slow = MockServer::start().await;
    let fast = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "city": "Slowtown", "latitude": 1.0, "longitude": 1.0 }))
                .set_delay(Duration::from_millis(600)),
        )
        .mount(&slow)
        .await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "city": "Fastville", "latitude": 2.0, "longitude": 2.0 }))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&fast)
        .await;

    let locators: Vec<Arc<dyn IpLocator>> = vec![
        Arc::new(HttpIpLocator::with_url(IpProviderId::IpApi, slow.uri(), Duration::from_secs(2)).expect("slow")),
        Arc::new(HttpIpLocator::with_url(IpProviderId::IfConfig, fast.uri(), Duration::from_secs(2)).expect("fast")),
    ];

    let winner = locate::race(&locators, Duration::from_secs(3)).await.expect("winner");
    assert_eq!(winner.provider, "ifconfig");
    assert_eq!(winner.guess.city.as_deref(), Some("Fastville"));
}

#[tokio::test]
async fn test_race_gives_up_when_every_provider_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let locators: Vec<Arc<dyn IpLocator>> = IpProviderId::all()
        .iter()
        .map(|id| {
            Arc::new(HttpIpLocator::with_url(*id, mock_server.uri(), Duration::from_secs(1)).expect("locator"))
                as Arc<dyn IpLocator>
        })
        .collect();

    assert!(locate::race(&locators, Duration::from_secs(3)).await.is_none());
}
