//! One weather lookup: request lifecycle plus session updates.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use crate::{context::WeatherContext, provider::WeatherProvider, store::StoreError};

/// Lifecycle of the latest lookup. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    pub is_loading: bool,
    /// The provider's error, exactly as it was returned.
    pub error: Option<Arc<anyhow::Error>>,
}

/// Runs lookups against a provider and records the results in a
/// [`WeatherContext`].
///
/// Lookups are neither queued nor deduplicated. Overlapping calls race and
/// whichever response lands last decides `weather` and `error`.
#[derive(Debug)]
pub struct WeatherFetcher {
    provider: Arc<dyn WeatherProvider>,
    context: Arc<WeatherContext>,
    request: watch::Sender<RequestState>,
}

impl WeatherFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>, context: Arc<WeatherContext>) -> Self {
        let (request, _) = watch::channel(RequestState::default());
        Self {
            provider,
            context,
            request,
        }
    }

    pub fn context(&self) -> &Arc<WeatherContext> {
        &self.context
    }

    pub fn is_loading(&self) -> bool {
        self.request.borrow().is_loading
    }

    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.request.borrow().error.clone()
    }

    pub fn request_state(&self) -> RequestState {
        self.request.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.request.subscribe()
    }

    /// Looks up `city` and stores the outcome.
    ///
    /// The city is recorded and the previous weather and error are cleared
    /// before the request goes out. On success the weather is stored; on
    /// failure the error is kept and weather stays empty. Loading is cleared
    /// either way.
    #[instrument(skip(self), level = "info")]
    pub async fn get_weather_for_city(&self, city: &str) {
        self.request.send_modify(|s| s.is_loading = true);
        log_store_failure(self.context.set_city(Some(city.to_string())));
        log_store_failure(self.context.set_weather(None));
        self.request.send_modify(|s| s.error = None);

        match self.provider.current_weather(city).await {
            Ok(weather) => {
                tracing::info!(name = %weather.name, temp = weather.main.temp, "weather received");
                log_store_failure(self.context.set_weather(Some(weather)));
            }
            Err(err) => {
                tracing::warn!(error = %err, "weather lookup failed");
                self.request.send_modify(|s| s.error = Some(Arc::new(err)));
            }
        }

        self.request.send_modify(|s| s.is_loading = false);
    }
}

// The in-memory session is already updated when a store write fails, so the
// lookup carries on.
fn log_store_failure(result: Result<(), StoreError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to persist weather session");
    }
}
