//! Holder of the last searched city and the weather retrieved for it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    model::CityWeather,
    state::{PersistedState, Setter},
    store::{KeyValueStore, StorageKey, StoreError},
};

/// The persisted pair shown to the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSession {
    pub city: Option<String>,
    pub weather: Option<CityWeather>,
}

/// Owns the `city` and `weather` bindings.
///
/// There is no global instance: code can only reach the session through a
/// context it was handed, usually as `Arc<WeatherContext>`.
#[derive(Debug)]
pub struct WeatherContext {
    city: PersistedState<String>,
    weather: PersistedState<CityWeather>,
}

impl WeatherContext {
    /// Restores the session from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let city = PersistedState::bind(Arc::clone(&store), StorageKey::City, None);
        let weather = PersistedState::bind(store, StorageKey::Weather, None);

        tracing::debug!(
            city = ?city.get(),
            has_weather = weather.get().is_some(),
            "weather session restored"
        );

        Self { city, weather }
    }

    pub fn city(&self) -> Option<String> {
        self.city.get()
    }

    pub fn weather(&self) -> Option<CityWeather> {
        self.weather.get()
    }

    pub fn session(&self) -> WeatherSession {
        WeatherSession {
            city: self.city(),
            weather: self.weather(),
        }
    }

    pub fn set_city(&self, city: Option<String>) -> Result<(), StoreError> {
        self.city.set(city)
    }

    pub fn set_weather(&self, weather: Option<CityWeather>) -> Result<(), StoreError> {
        self.weather.set(weather)
    }

    pub fn city_setter(&self) -> Setter<String> {
        self.city.setter()
    }

    pub fn weather_setter(&self) -> Setter<CityWeather> {
        self.weather.setter()
    }

    pub fn subscribe_city(&self) -> watch::Receiver<Option<String>> {
        self.city.subscribe()
    }

    pub fn subscribe_weather(&self) -> watch::Receiver<Option<CityWeather>> {
        self.weather.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::tests::sample, store::MemoryStore};

    #[test]
    fn starts_empty_without_records() {
        let ctx = WeatherContext::new(Arc::new(MemoryStore::new()));
        assert_eq!(ctx.session(), WeatherSession::default());
    }

    #[test]
    fn restores_previous_session() {
        let weather = sample();
        let store = Arc::new(MemoryStore::with_records([
            (StorageKey::City, "\"San Francisco\"".to_string()),
            (StorageKey::Weather, serde_json::to_string(&weather).unwrap()),
        ]));

        let ctx = WeatherContext::new(store);

        assert_eq!(ctx.city().as_deref(), Some("San Francisco"));
        assert_eq!(ctx.weather(), Some(weather));
    }

    #[test]
    fn writes_are_mirrored_into_store() {
        let store = Arc::new(MemoryStore::new());
        let ctx = WeatherContext::new(store.clone());
        let weather = sample();

        ctx.set_city(Some("San Francisco".into())).unwrap();
        ctx.set_weather(Some(weather.clone())).unwrap();

        let raw_city = store.get(StorageKey::City).unwrap();
        let raw_weather = store.get(StorageKey::Weather).unwrap();
        assert_eq!(serde_json::from_str::<String>(&raw_city).unwrap(), "San Francisco");
        assert_eq!(serde_json::from_str::<CityWeather>(&raw_weather).unwrap(), weather);

        ctx.set_weather(None).unwrap();
        assert_eq!(store.get(StorageKey::Weather), None);
        assert!(store.get(StorageKey::City).is_some());
    }

    #[test]
    fn session_survives_a_new_context() {
        let store = Arc::new(MemoryStore::new());
        let weather = sample();

        let ctx = WeatherContext::new(store.clone());
        ctx.set_city(Some("San Francisco".into())).unwrap();
        ctx.set_weather(Some(weather.clone())).unwrap();
        drop(ctx);

        let restored = WeatherContext::new(store);
        assert_eq!(
            restored.session(),
            WeatherSession {
                city: Some("San Francisco".into()),
                weather: Some(weather),
            }
        );
    }

    #[test]
    fn setters_are_the_binding_setters() {
        let ctx = WeatherContext::new(Arc::new(MemoryStore::new()));

        assert_eq!(ctx.city_setter(), ctx.city_setter());
        ctx.city_setter().set(Some("Kyiv".into())).unwrap();
        assert_eq!(ctx.city().as_deref(), Some("Kyiv"));
    }
}
