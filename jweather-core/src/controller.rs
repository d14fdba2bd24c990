//! Application controller.
//!
//! The controller owns [`AppState`] and the [`Presenter`] and is the only
//! place either is mutated. Network work runs in spawned workers that post
//! [`UiEvent`]s back over a channel; the front-end drives the controller by
//! awaiting [`Controller::run_until_idle`] or calling [`Controller::drain`].
//!
//! Every fetch is tagged with a sequence number. Completions for anything but
//! the latest request are dropped, so a slow stale response can never replace
//! a newer one.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinSet,
};

use crate::{
    config::Config,
    error::WeatherError,
    forecast::{ForecastClient, ForecastSource},
    geocode::{Geocoder, PlaceLookup, normalize_place_name},
    locate::{self, IpLocator, RaceWinner, locators_for},
    model::{Coordinate, GeocodeResult, WeatherBundle},
    validate::parse_coordinate,
};

pub const INITIAL_STATUS: &str = "Enter coordinates or city and fetch";
pub const IDLE_PROMPT: &str = "Enter a city or coordinates to fetch";

/// Where the controller sends everything the user should see.
///
/// Implementations only display; they never start network calls.
pub trait Presenter {
    fn status(&mut self, message: &str);

    fn error(&mut self, error: &WeatherError);

    /// Input fields were filled in on the user's behalf.
    fn fields_changed(&mut self, _fields: &InputFields) {}

    fn render(&mut self, bundle: &WeatherBundle);
}

/// Text of the coordinate and city inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputFields {
    pub latitude: String,
    pub longitude: String,
    pub city: String,
}

/// A user-initiated lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Coordinates { latitude: String, longitude: String },
    City(String),
}

/// Messages posted from workers back to the controller.
#[derive(Debug)]
pub enum UiEvent {
    /// Progress text. Fetch-scoped messages carry the fetch's sequence number.
    Status { seq: Option<u64>, message: String },
    Resolved { seq: u64, place: GeocodeResult },
    FetchFinished { seq: u64, result: Result<WeatherBundle, WeatherError> },
    AutoLocateFinished(Option<RaceWinner>),
}

#[derive(Debug, Default)]
pub struct AppState {
    pub fields: InputFields,
    pub status: String,
    /// Latest authoritative bundle. Replaced wholesale, never merged.
    pub last_bundle: Option<WeatherBundle>,
    latest_seq: u64,
    fetch_in_flight: bool,
    auto_locating: bool,
    user_requested: bool,
}

impl AppState {
    fn begin_fetch(&mut self) -> u64 {
        self.latest_seq += 1;
        self.fetch_in_flight = true;
        self.latest_seq
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest_seq
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn is_busy(&self) -> bool {
        self.fetch_in_flight || self.auto_locating
    }
}

/// Remote collaborators the controller dispatches work to.
#[derive(Debug, Clone)]
pub struct Services {
    pub forecast: Arc<dyn ForecastSource>,
    pub geocoder: Arc<dyn PlaceLookup>,
    pub locators: Vec<Arc<dyn IpLocator>>,
    pub auto_locate_budget: Duration,
}

impl Services {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let forecast = ForecastClient::new(
            config.endpoints.forecast_url.as_str(),
            config.variant,
            config.timeouts.forecast(),
        )?;
        let geocoder = Geocoder::new(config.endpoints.geocoding_url.as_str(), config.timeouts.geocoding())?;

        let locators = if config.auto_locate.enabled {
            locators_for(&config.ip_providers()?, config.timeouts.ip_lookup())?
        } else {
            Vec::new()
        };

        Ok(Self {
            forecast: Arc::new(forecast),
            geocoder: Arc::new(geocoder),
            locators,
            auto_locate_budget: config.timeouts.auto_locate_budget(),
        })
    }
}

pub struct Controller<P> {
    state: AppState,
    presenter: P,
    services: Services,
    tx: UnboundedSender<UiEvent>,
    rx: UnboundedReceiver<UiEvent>,
    workers: JoinSet<()>,
}

impl<P: Presenter> Controller<P> {
    pub fn new(services: Services, mut presenter: P) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        presenter.status(INITIAL_STATUS);

        Self {
            state: AppState { status: INITIAL_STATUS.to_string(), ..AppState::default() },
            presenter,
            services,
            tx,
            rx,
            workers: JoinSet::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Start a lookup on the user's behalf. Validation failures are reported
    /// immediately and no worker is spawned.
    pub fn submit(&mut self, request: FetchRequest) {
        self.state.user_requested = true;
        self.dispatch(request);
    }

    /// Race the IP providers in the background. No-op without locators.
    pub fn start_auto_locate(&mut self) {
        if self.services.locators.is_empty() {
            return;
        }

        self.state.auto_locating = true;
        self.set_status("Locating your city…");

        let locators = self.services.locators.clone();
        let budget = self.services.auto_locate_budget;
        let tx = self.tx.clone();
        self.workers.spawn(async move {
            let winner = locate::race(&locators, budget).await;
            let _ = tx.send(UiEvent::AutoLocateFinished(winner));
        });
    }

    /// Process events until no fetch or auto-locate is outstanding.
    pub async fn run_until_idle(&mut self) {
        while self.process_next().await {}
        self.reap_workers();
    }

    /// Wait for one event and apply it. Returns `false` without waiting when
    /// nothing is outstanding. Cancel-safe.
    pub async fn process_next(&mut self) -> bool {
        if !self.state.is_busy() {
            return false;
        }
        match self.rx.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Keep applying events until `until` resolves, e.g. a pending prompt.
    /// Background work keeps making progress while the caller waits.
    pub async fn run_until<F: Future>(&mut self, until: F) -> F::Output {
        tokio::pin!(until);
        let output = loop {
            tokio::select! {
                output = &mut until => break output,
                _ = self.process_next(), if self.state.is_busy() => {}
            }
        };
        self.reap_workers();
        output
    }

    /// Apply every event that has already arrived, without waiting.
    pub fn drain(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event);
        }
        self.reap_workers();
    }

    pub fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Status { seq, message } => {
                if seq.is_none_or(|s| self.state.is_current(s)) {
                    self.set_status(&message);
                }
            }
            UiEvent::Resolved { seq, place } => {
                if !self.state.is_current(seq) {
                    return;
                }
                self.reflect_coordinate(&place.coordinate);
                self.set_status(&format!("Found {}", place.label()));
            }
            UiEvent::FetchFinished { seq, result } => {
                if !self.state.is_current(seq) {
                    tracing::debug!(seq, latest = self.state.latest_seq, "dropping stale fetch result");
                    return;
                }
                self.state.fetch_in_flight = false;

                match result {
                    Ok(bundle) => {
                        self.presenter.render(&bundle);
                        self.set_status(&format!("Updated • {}", bundle.coordinate));
                        self.state.last_bundle = Some(bundle);
                    }
                    Err(e) => self.fail(&e),
                }
            }
            UiEvent::AutoLocateFinished(winner) => {
                self.state.auto_locating = false;
                self.on_auto_located(winner);
            }
        }
    }

    fn on_auto_located(&mut self, winner: Option<RaceWinner>) {
        if self.state.user_requested {
            tracing::debug!("user already requested a lookup; ignoring auto-locate result");
            return;
        }

        let Some(RaceWinner { provider, guess }) = winner else {
            self.set_status(IDLE_PROMPT);
            return;
        };

        if let Some(coordinate) = guess.coordinate {
            tracing::info!(%provider, %coordinate, "auto-located by coordinates");
            self.reflect_coordinate(&coordinate);
            self.fetch_coordinate(coordinate);
        } else if let Some(city) = guess.city {
            tracing::info!(%provider, %city, "auto-located by city name");
            self.state.fields.city = city.clone();
            self.presenter.fields_changed(&self.state.fields);
            self.set_status("Finding coordinates…");
            self.dispatch(FetchRequest::City(city));
        } else {
            self.set_status(IDLE_PROMPT);
        }
    }

    fn dispatch(&mut self, request: FetchRequest) {
        match request {
            FetchRequest::Coordinates { latitude, longitude } => {
                let parsed = parse_coordinate(&latitude, &longitude);
                self.state.fields.latitude = latitude;
                self.state.fields.longitude = longitude;

                match parsed {
                    Ok(coordinate) => self.fetch_coordinate(coordinate),
                    Err(e) => self.fail(&e),
                }
            }
            FetchRequest::City(name) => {
                let query = normalize_place_name(&name).map(str::to_string);
                self.state.fields.city = name;

                match query {
                    Ok(query) => self.fetch_city(query),
                    Err(e) => self.fail(&e),
                }
            }
        }
    }

    fn fetch_coordinate(&mut self, coordinate: Coordinate) {
        let seq = self.state.begin_fetch();
        self.set_status("Fetching…");
        tracing::debug!(seq, %coordinate, "starting forecast fetch");

        let forecast = Arc::clone(&self.services.forecast);
        let tx = self.tx.clone();
        self.workers.spawn(async move {
            let result = forecast.fetch(&coordinate).await;
            let _ = tx.send(UiEvent::FetchFinished { seq, result });
        });
    }

    fn fetch_city(&mut self, query: String) {
        let seq = self.state.begin_fetch();
        self.set_status("Locating…");
        tracing::debug!(seq, %query, "starting geocode + forecast fetch");

        let geocoder = Arc::clone(&self.services.geocoder);
        let forecast = Arc::clone(&self.services.forecast);
        let tx = self.tx.clone();
        self.workers.spawn(async move {
            let result: Result<WeatherBundle, WeatherError> = async {
                let place = geocoder.search(&query).await?;
                let coordinate = place.coordinate;
                let _ = tx.send(UiEvent::Resolved { seq, place });
                let _ = tx.send(UiEvent::Status { seq: Some(seq), message: "Fetching…".into() });
                forecast.fetch(&coordinate).await
            }
            .await;
            let _ = tx.send(UiEvent::FetchFinished { seq, result });
        });
    }

    fn reflect_coordinate(&mut self, coordinate: &Coordinate) {
        self.state.fields.latitude = format!("{:.6}", coordinate.latitude());
        self.state.fields.longitude = format!("{:.6}", coordinate.longitude());
        self.presenter.fields_changed(&self.state.fields);
    }

    fn set_status(&mut self, message: &str) {
        self.state.status = message.to_string();
        self.presenter.status(message);
    }

    /// Errors go to the presenter's error sink; the status line keeps a short form.
    fn fail(&mut self, error: &WeatherError) {
        tracing::warn!(%error, "lookup failed");
        self.state.status = error.status_line();
        self.presenter.error(error);
    }

    fn reap_workers(&mut self) {
        while let Some(joined) = self.workers.try_join_next() {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!(error = %e, "worker panicked");
                }
            }
        }
    }
}
