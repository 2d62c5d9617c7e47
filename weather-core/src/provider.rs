use async_trait::async_trait;
use std::fmt::Debug;

use crate::{CityWeather, Config, provider::openweather::OpenWeatherProvider};

pub mod openweather;

/// Source of current weather for a city name.
///
/// Implementations return the transport's own error unchanged; callers
/// decide how to present it.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> anyhow::Result<CityWeather>;
}

/// Construct the OpenWeather provider described by `config`.
pub fn provider_from_config(config: &Config) -> Box<dyn WeatherProvider> {
    let mut provider = OpenWeatherProvider::new(config.api_key());
    if let Some(base_url) = config.base_url.as_deref() {
        provider = provider.with_base_url(base_url);
    }
    Box::new(provider)
}
