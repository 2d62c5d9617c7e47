//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - The persisted weather session (key-value store, bound state, context)
//! - The lookup workflow that fills the session from a weather provider
//! - Configuration and the OpenWeather provider
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod config;
pub mod context;
pub mod fetch;
pub mod model;
pub mod provider;
pub mod state;
pub mod store;

pub use config::Config;
pub use context::{WeatherContext, WeatherSession};
pub use fetch::{RequestState, WeatherFetcher};
pub use model::CityWeather;
pub use provider::{WeatherProvider, openweather::{ApiKey, OpenWeatherProvider}};
pub use state::{PersistedState, Setter, Truthy};
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageKey, StoreError};
