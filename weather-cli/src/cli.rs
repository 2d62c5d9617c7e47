use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::Password;
use weather_core::{
    Config, FileStore, WeatherContext, WeatherFetcher, WeatherProvider,
    provider::provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather by city name")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an OpenWeather API key in the config file.
    Configure,

    /// Look up current weather for a city and remember it.
    Show {
        /// City name, e.g. "San Francisco".
        city: String,
    },

    /// Print the last search and its weather without going online.
    Last,

    /// Forget the last search.
    Clear,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config)?,
            Command::Show { city } => return show(&config, &city).await,
            Command::Last => {
                let context = open_context(&config)?;
                print!("{}", render::last_session(&context.session()));
            }
            Command::Clear => {
                let context = open_context(&config)?;
                context.set_city(None)?;
                context.set_weather(None)?;
                println!("Cleared last search.");
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let key = Password::new("OpenWeather API key (empty to use the environment):")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(key.trim().to_string());
    config.save()?;

    if config.has_stored_api_key() {
        println!("API key saved to {}", Config::config_file_path()?.display());
    } else {
        println!("No key stored; the API key will be read from the environment.");
    }

    Ok(())
}

async fn show(config: &Config, city: &str) -> anyhow::Result<ExitCode> {
    // Searching is only offered for a non-empty city name.
    if city.is_empty() {
        bail!("City name must not be empty");
    }

    let context = open_context(config)?;
    let provider: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(config));
    let fetcher = WeatherFetcher::new(provider, Arc::clone(&context));

    let mut request = fetcher.subscribe();
    let lookup = fetcher.get_weather_for_city(city);
    tokio::pin!(lookup);

    let mut loading_shown = false;
    loop {
        tokio::select! {
            _ = &mut lookup => break,
            Ok(()) = request.changed() => {
                if request.borrow_and_update().is_loading && !loading_shown {
                    eprintln!("{}", render::LOADING);
                    loading_shown = true;
                }
            }
        }
    }

    let state = fetcher.request_state();
    print!("{}", render::screen(&context.session(), &state));

    Ok(if state.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn open_context(config: &Config) -> anyhow::Result<Arc<WeatherContext>> {
    let dir = config.data_dir()?;
    let store = FileStore::open(dir.as_path())
        .with_context(|| format!("Failed to open weather store: {}", dir.display()))?;
    tracing::debug!(dir = %dir.display(), "weather store ready");

    Ok(Arc::new(WeatherContext::new(Arc::new(store))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_show_with_spaces() {
        let cli = Cli::try_parse_from(["weather", "show", "San Francisco"]).unwrap();
        match cli.command {
            Command::Show { city } => assert_eq!(city, "San Francisco"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_requires_city() {
        assert!(Cli::try_parse_from(["weather", "show"]).is_err());
    }

    #[tokio::test]
    async fn show_rejects_empty_city() {
        let err = show(&Config::default(), "").await.unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn open_context_uses_configured_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: Some(dir.path().join("store")),
            ..Config::default()
        };

        let context = open_context(&config).unwrap();
        context.set_city(Some("Oslo".into())).unwrap();

        assert!(dir.path().join("store").join("city.json").exists());
        assert_eq!(open_context(&config).unwrap().city().as_deref(), Some("Oslo"));
    }
}
