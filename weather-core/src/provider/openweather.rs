use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use crate::model::CityWeather;

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Environment variable consulted for the API key unless configured otherwise.
pub const DEFAULT_API_KEY_ENV: &str = "OPEN_WEATHER_API_KEY";

/// Placeholder sent when no API key is available.
const MISSING_KEY: &str = "undefined";

/// Where the API key comes from. Resolved on every request.
#[derive(Clone, PartialEq, Eq)]
pub enum ApiKey {
    /// Read the named environment variable at call time.
    Env(String),
    Static(String),
}

impl ApiKey {
    pub fn resolve(&self) -> String {
        self.resolve_with(|var| std::env::var(var).ok())
    }

    fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        match self {
            ApiKey::Env(var) => lookup(var).unwrap_or_else(|| MISSING_KEY.to_string()),
            ApiKey::Static(key) => key.clone(),
        }
    }
}

impl Default for ApiKey {
    fn default() -> Self {
        ApiKey::Env(DEFAULT_API_KEY_ENV.to_string())
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKey::Env(var) => f.debug_tuple("Env").field(var).finish(),
            ApiKey::Static(_) => f.write_str("Static(<redacted>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: ApiKey,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Current-weather URL for `city`.
    ///
    /// The city is interpolated as given; no percent-encoding happens here.
    pub fn current_weather_url(&self, city: &str) -> String {
        format!(
            "{}/weather?q={}&appid={}",
            self.base_url,
            city,
            self.api_key.resolve()
        )
    }

    async fn fetch_current(&self, city: &str) -> Result<CityWeather> {
        let url = self.current_weather_url(city);

        // The URL carries the API key; errors leave this function without it.
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = res.status();
        let rejected = res.error_for_status_ref().err().map(reqwest::Error::without_url);
        if let Some(err) = rejected {
            let body = res.text().await.unwrap_or_default();
            tracing::debug!(%status, body = %truncate_body(&body), "OpenWeather rejected request");
            return Err(err.into());
        }

        let weather = res
            .json::<CityWeather>()
            .await
            .map_err(reqwest::Error::without_url)?;
        Ok(weather)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, city: &str) -> Result<CityWeather> {
        self.fetch_current(city).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
