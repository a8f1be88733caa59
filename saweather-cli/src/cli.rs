use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use saweather_core::{
    Config, Coordinate, JsonlSink, LocationResolver, LookupStatus, PlaceQuery, ResolverSettings,
    WeatherFetcher, WeatherLookup, provider_from_config,
};
use tracing::{debug, warn};

use crate::{
    device::{DesktopLocationService, TerminalPrompt},
    render,
};

const API_KEY_ENV: &str = "SAWEATHER_API_KEY";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "saweather", version, about = "Current weather for where you are")]
pub struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, account and fallback city.
    Configure,

    /// Show weather for the current location.
    Show {
        /// Latitude of the last known position.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude of the last known position.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Show weather for a place name.
    Search {
        /// Place name, e.g. "Cape Town".
        place: String,
    },

    /// List lookups recorded for the configured account.
    History,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, lon } => {
                let seeded = lat.zip(lon).map(|(lat, lon)| Coordinate::new(lat, lon));
                show(seeded).await
            }
            Command::Search { place } => search(&place).await,
            Command::History => history(),
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        debug!("using API key from {API_KEY_ENV}");
        config.set_api_key(key);
    }
    Ok(config)
}

fn owner_id(config: &Config) -> anyhow::Result<String> {
    config.owner_id.clone().ok_or_else(|| {
        anyhow!(
            "No account configured.\n\
             Hint: run `saweather configure` and enter an account id."
        )
    })
}

fn build_lookup(
    config: &Config,
    device: Arc<DesktopLocationService>,
    prompt: Arc<TerminalPrompt>,
) -> anyhow::Result<WeatherLookup> {
    let owner = owner_id(config)?;
    let api = provider_from_config(config)?;
    let sink = Arc::new(JsonlSink::new(Config::history_file_path()?));

    let resolver = LocationResolver::new(device, ResolverSettings::from_config(config)?);
    let fetcher = WeatherFetcher::new(Arc::from(api), sink, owner, config.fallback_place()?);

    Ok(WeatherLookup::new(resolver, fetcher, prompt))
}

async fn show(seeded: Option<Coordinate>) -> anyhow::Result<()> {
    let mut config = load_config()?;

    let device = Arc::new(DesktopLocationService::new(
        config.device.permission_granted.unwrap_or(false),
        seeded.or(config.device.last_known),
    ));
    let prompt = Arc::new(TerminalPrompt::new(
        device.clone(),
        config.device.permission_granted,
    ));

    let status = build_lookup(&config, device, prompt.clone())?.refresh().await;

    if let Some(granted) = prompt.new_answer() {
        config.device.permission_granted = Some(granted);
        if let Err(e) = config.save() {
            warn!(error = %e, "could not save permission answer");
        }
    }

    print_status(status)
}

async fn search(place: &str) -> anyhow::Result<()> {
    let Ok(place) = PlaceQuery::new(place) else {
        return Err(anyhow!("Please enter a place name"));
    };

    let config = load_config()?;
    let device = Arc::new(DesktopLocationService::new(false, None));
    let prompt = Arc::new(TerminalPrompt::new(device.clone(), Some(false)));

    let status = build_lookup(&config, device, prompt)?.search(&place).await;
    print_status(status)
}

fn print_status(status: LookupStatus) -> anyhow::Result<()> {
    match status {
        LookupStatus::Completed(report) => {
            for notice in render::notices(&report) {
                eprintln!("! {notice}");
            }
            print!("{}", render::snapshot(&report.fetched.snapshot, &Local::now()));
            Ok(())
        }
        LookupStatus::Busy => Err(anyhow!("A lookup is already running")),
        LookupStatus::Abandoned => Err(anyhow!("Lookup was cancelled")),
    }
}

fn history() -> anyhow::Result<()> {
    let config = load_config()?;
    let owner = owner_id(&config)?;
    let sink = JsonlSink::new(Config::history_file_path()?);

    let records = sink
        .records_for(&owner)
        .with_context(|| format!("Failed to read history file: {}", sink.path().display()))?;

    if records.is_empty() {
        println!("No lookups recorded yet.");
        return Ok(());
    }

    for record in &records {
        println!("{}", render::history_line(record));
    }
    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("API key prompt was cancelled")?;
    if !key.trim().is_empty() {
        config.set_api_key(key.trim().to_string());
    }

    let current_owner = config.owner_id.clone().unwrap_or_default();
    let owner = Text::new("Account id:")
        .with_default(&current_owner)
        .prompt()
        .context("Account prompt was cancelled")?;
    if !owner.trim().is_empty() {
        config.owner_id = Some(owner.trim().to_string());
    }

    let city = Text::new("Fallback city:")
        .with_default(&config.fallback_city)
        .prompt()
        .context("Fallback city prompt was cancelled")?;
    let city = PlaceQuery::new(city).context("Fallback city must not be empty")?;
    config.fallback_city = city.to_string();

    config.save()?;
    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}
