//! Binding of a single store key to observable in-memory state.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::watch;

use crate::{
    model::CityWeather,
    store::{KeyValueStore, StorageKey, StoreError},
};

/// Whether a value counts as "set" for persistence purposes.
///
/// Falsy values are never written: setting one removes the record instead.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

macro_rules! int_truthy {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

int_truthy!(i32, i64, u32, u64);

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for CityWeather {
    fn is_truthy(&self) -> bool {
        true
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

struct Binding<T> {
    key: StorageKey,
    store: Arc<dyn KeyValueStore>,
    current: watch::Sender<Option<T>>,
    // Held across the memory update and the store write so concurrent
    // setters leave both holding the same value.
    write: Mutex<()>,
}

impl<T> Binding<T>
where
    T: Serialize + Truthy,
{
    fn set(&self, value: Option<T>) -> Result<(), StoreError> {
        let persist = match value.as_ref().filter(|v| v.is_truthy()) {
            Some(v) => match serde_json::to_string(v) {
                Ok(json) => Some(json),
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "value not serializable, dropping record");
                    None
                }
            },
            None => None,
        };

        let _guard = self.write.lock();

        // Memory keeps exactly what the caller passed, even when the record
        // is removed for a falsy value.
        self.current.send_replace(value);

        match persist {
            Some(json) => self.store.set(self.key, &json),
            None => self.store.delete(self.key),
        }
    }
}

/// A store key bound to an in-memory value that observers can subscribe to.
pub struct PersistedState<T> {
    binding: Arc<Binding<T>>,
}

impl<T> PersistedState<T>
where
    T: Serialize + DeserializeOwned + Truthy + Clone + Send + Sync + 'static,
{
    /// Reads `key` once; an absent or undecodable record falls back to
    /// `fallback`.
    pub fn bind(store: Arc<dyn KeyValueStore>, key: StorageKey, fallback: Option<T>) -> Self {
        let initial = store
            .get(key)
            .and_then(|raw| match serde_json::from_str::<T>(&raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "stored record is corrupt, ignoring it");
                    None
                }
            })
            .or(fallback);

        let (current, _) = watch::channel(initial);

        Self {
            binding: Arc::new(Binding {
                key,
                store,
                current,
                write: Mutex::new(()),
            }),
        }
    }

    pub fn key(&self) -> StorageKey {
        self.binding.key
    }

    pub fn get(&self) -> Option<T> {
        self.binding.current.borrow().clone()
    }

    /// Updates the value and mirrors it into the store.
    ///
    /// The in-memory value is updated even if the store write fails.
    pub fn set(&self, value: Option<T>) -> Result<(), StoreError> {
        self.binding.set(value)
    }

    /// Handle for writing this binding; every handle from the same binding
    /// compares equal.
    pub fn setter(&self) -> Setter<T> {
        Setter {
            binding: Arc::clone(&self.binding),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.binding.current.subscribe()
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistedState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedState")
            .field("key", &self.binding.key)
            .field("current", &*self.binding.current.borrow())
            .finish()
    }
}

pub struct Setter<T> {
    binding: Arc<Binding<T>>,
}

impl<T> Setter<T>
where
    T: Serialize + Truthy,
{
    pub fn set(&self, value: Option<T>) -> Result<(), StoreError> {
        self.binding.set(value)
    }

    pub fn key(&self) -> StorageKey {
        self.binding.key
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            binding: Arc::clone(&self.binding),
        }
    }
}

impl<T> PartialEq for Setter<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.binding, &other.binding)
    }
}

impl<T> Eq for Setter<T> {}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("key", &self.binding.key).finish()
    }
}
