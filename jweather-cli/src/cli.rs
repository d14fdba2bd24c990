use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Select, Text};
use jweather_core::{Config, Controller, FetchRequest, FieldSet, InputFields, Services};

use crate::render::{self, TerminalPresenter};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "jweather", version, about = "Current weather and weekly outlook by coordinates or city")]
pub struct Cli {
    /// Fetch and show only the minimal set of current fields.
    #[arg(long, global = true)]
    pub minimal: bool,

    /// Do not guess your location from your IP address on startup.
    #[arg(long, global = true)]
    pub no_auto_locate: bool,

    /// Defaults to `interactive`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prompt for lookups until you quit.
    Interactive,

    /// Show weather for a latitude/longitude pair.
    Coords {
        #[arg(allow_hyphen_values = true)]
        latitude: String,

        #[arg(allow_hyphen_values = true)]
        longitude: String,
    },

    /// Show weather for a city, e.g. `jweather city New York`.
    City {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Guess your location from your IP address and show its weather.
    Locate,

    /// Inspect or create the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,

    /// Write the default configuration to the config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location.
    Path,
}

enum Action {
    Fetch(FetchRequest),
    DayDetails(usize),
    Quit,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let Cli { minimal, no_auto_locate, command } = self;

        match command.unwrap_or(Command::Interactive) {
            Command::Config { action } => {
                config_command(action)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Interactive => {
                let (mut controller, _) = build_controller(minimal, no_auto_locate)?;
                interactive(&mut controller).await?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Coords { latitude, longitude } => {
                let (mut controller, _) = build_controller(minimal, no_auto_locate)?;
                controller.submit(FetchRequest::Coordinates { latitude, longitude });
                Ok(finish(&mut controller).await)
            }
            Command::City { name } => {
                let (mut controller, _) = build_controller(minimal, no_auto_locate)?;
                controller.submit(FetchRequest::City(name.join(" ")));
                Ok(finish(&mut controller).await)
            }
            Command::Locate => {
                let (mut controller, config) = build_controller(minimal, no_auto_locate)?;
                if !config.auto_locate.enabled {
                    bail!("Auto-locate is disabled; enable it in the config file or drop --no-auto-locate");
                }
                controller.start_auto_locate();
                Ok(finish(&mut controller).await)
            }
        }
    }
}

/// Load config, apply the global flags and wire up the controller.
fn build_controller(minimal: bool, no_auto_locate: bool) -> anyhow::Result<(Controller<TerminalPresenter>, Config)> {
    let mut config = Config::load()?;
    if minimal {
        config.variant = FieldSet::Minimal;
    }
    if no_auto_locate {
        config.auto_locate.enabled = false;
    }

    let services = Services::from_config(&config)?;
    let controller = Controller::new(services, TerminalPresenter::new(config.variant));
    Ok((controller, config))
}

/// Wait for the one-shot lookup; failure when nothing was rendered.
async fn finish(controller: &mut Controller<TerminalPresenter>) -> ExitCode {
    controller.run_until_idle().await;
    if controller.state().last_bundle.is_some() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn config_command(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => print!("{}", Config::load()?.to_toml()?),
        ConfigAction::Path => println!("{}", Config::config_file_path()?.display()),
        ConfigAction::Init { force } => {
            let path = Config::config_file_path()?;
            if path.exists() && !force {
                bail!("Config file already exists: {} (use --force to overwrite)", path.display());
            }
            let path = Config::default().save()?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}

/// The prompt opens right away; auto-locate keeps running behind it and a
/// lookup submitted before it finishes takes precedence.
async fn interactive(controller: &mut Controller<TerminalPresenter>) -> anyhow::Result<()> {
    controller.start_auto_locate();

    loop {
        controller.drain();

        let fields = controller.state().fields.clone();
        let days = controller.state().last_bundle.as_ref().map(render::day_labels).unwrap_or_default();

        let pending = tokio::task::spawn_blocking(move || prompt(&fields, &days));
        let action = controller.run_until(pending).await.context("Prompt task failed")??;

        match action {
            Action::Fetch(request) => {
                controller.submit(request);
                controller.run_until_idle().await;
            }
            Action::DayDetails(index) => {
                if let Some(bundle) = &controller.state().last_bundle {
                    println!("{}", render::day_details(bundle, index));
                }
            }
            Action::Quit => break,
        }
    }

    Ok(())
}

const CHOICE_CITY: &str = "Look up a city";
const CHOICE_COORDS: &str = "Enter coordinates";
const CHOICE_DAY: &str = "Show day details";
const CHOICE_QUIT: &str = "Quit";

/// Blocking prompt; runs off the async runtime. Esc and Ctrl-C quit.
fn prompt(fields: &InputFields, days: &[String]) -> anyhow::Result<Action> {
    match prompt_inner(fields, days) {
        Ok(action) => Ok(action),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(Action::Quit),
        Err(e) => Err(e.into()),
    }
}

fn prompt_inner(fields: &InputFields, days: &[String]) -> Result<Action, InquireError> {
    let mut choices = vec![CHOICE_CITY, CHOICE_COORDS];
    if !days.is_empty() {
        choices.push(CHOICE_DAY);
    }
    choices.push(CHOICE_QUIT);

    let action = match Select::new("What next?", choices).prompt()? {
        CHOICE_CITY => {
            let city = Text::new("City:").with_initial_value(&fields.city).prompt()?;
            Action::Fetch(FetchRequest::City(city))
        }
        CHOICE_COORDS => {
            let latitude = Text::new("Latitude:").with_initial_value(&fields.latitude).prompt()?;
            let longitude = Text::new("Longitude:").with_initial_value(&fields.longitude).prompt()?;
            Action::Fetch(FetchRequest::Coordinates { latitude, longitude })
        }
        CHOICE_DAY => {
            let picked = Select::new("Day:", days.to_vec()).raw_prompt()?;
            Action::DayDetails(picked.index)
        }
        _ => Action::Quit,
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["jweather"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(!cli.minimal);
    }

    #[test]
    fn negative_coordinates_are_not_flags() {
        let cli = Cli::try_parse_from(["jweather", "coords", "-33.8688", "-151.2093"]).expect("parse");
        match cli.command {
            Some(Command::Coords { latitude, longitude }) => {
                assert_eq!(latitude, "-33.8688");
                assert_eq!(longitude, "-151.2093");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn city_words_are_collected() {
        let cli = Cli::try_parse_from(["jweather", "--minimal", "city", "New", "York"]).expect("parse");
        assert!(cli.minimal);
        match cli.command {
            Some(Command::City { name }) => assert_eq!(name.join(" "), "New York"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn city_requires_a_name() {
        assert!(Cli::try_parse_from(["jweather", "city"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["jweather", "locate", "--no-auto-locate"]).expect("parse");
        assert!(cli.no_auto_locate);
        assert!(matches!(cli.command, Some(Command::Locate)));
    }

    #[tokio::test]
    async fn config_path_runs_without_building_services() {
        let cli = Cli::try_parse_from(["jweather", "--no-auto-locate", "config", "path"]).expect("parse");
        cli.run().await.expect("config path");
    }

    #[test]
    fn config_init_force() {
        let cli = Cli::try_parse_from(["jweather", "config", "init", "--force"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Command::Config { action: ConfigAction::Init { force: true } })
        ));
    }
}
