//! core::bus
//!
//! Process-wide event bus.
//!
//! # Design
//!
//! The bus is built once in `main` and handed to everything that needs it
//! (the dispatcher passes it on to each [`crate::store::SqlStore`]). There is
//! no global accessor. Delivery is synchronous and in subscription order;
//! the first failing listener aborts the publish and its error is returned
//! to the publisher.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

/// Events published by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A store finished `init()` and is ready for use.
    StoreInitialized { path: PathBuf },
    /// A user's password hash was replaced.
    UserPasswordChanged { user_id: i64, login: String },
    /// A data source's plaintext secrets were moved into sealed storage.
    DataSourceSecured { id: i64, name: String },
}

impl Event {
    /// Stable name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StoreInitialized { .. } => "store-initialized",
            Event::UserPasswordChanged { .. } => "user-password-changed",
            Event::DataSourceSecured { .. } => "data-source-secured",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::StoreInitialized { path } => {
                write!(f, "{} path={}", self.name(), path.display())
            }
            Event::UserPasswordChanged { user_id, login } => {
                write!(f, "{} user_id={} login={}", self.name(), user_id, login)
            }
            Event::DataSourceSecured { id, name } => {
                write!(f, "{} id={} name={}", self.name(), id, name)
            }
        }
    }
}

/// Errors from publishing.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("listener for '{event}' failed: {message}")]
    ListenerFailed { event: &'static str, message: String },

    #[error("event bus is poisoned")]
    Poisoned,
}

type Listener = Box<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Synchronous publish/subscribe hub.
#[derive(Default)]
pub struct Bus {
    listeners: Mutex<Vec<Listener>>,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every event.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Deliver `event` to every listener in subscription order.
    pub fn publish(&self, event: &Event) -> Result<(), BusError> {
        let listeners = self.listeners.lock().map_err(|_| BusError::Poisoned)?;
        for listener in listeners.iter() {
            listener(event).map_err(|e| BusError::ListenerFailed {
                event: event.name(),
                message: format!("{:#}", e),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn publish_reaches_every_listener() {
        let bus = Bus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        bus.publish(&Event::StoreInitialized {
            path: PathBuf::from("/tmp/dash.db"),
        })
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(bus.listener_count(), 3);
    }

    #[test]
    fn failing_listener_stops_delivery() {
        let bus = Bus::new();
        let later = Arc::new(AtomicUsize::new(0));
        bus.subscribe(|_| anyhow::bail!("refused"));
        {
            let later = Arc::clone(&later);
            bus.subscribe(move |_| {
                later.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let err = bus
            .publish(&Event::UserPasswordChanged {
                user_id: 1,
                login: "admin".to_string(),
            })
            .unwrap_err();

        assert!(err.to_string().contains("user-password-changed"));
        assert!(err.to_string().contains("refused"));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn publish_without_listeners_is_ok() {
        let bus = Bus::new();
        let event = Event::DataSourceSecured {
            id: 7,
            name: "prom".to_string(),
        };
        assert!(bus.publish(&event).is_ok());
        assert_eq!(event.to_string(), "data-source-secured id=7 name=prom");
    }
}
