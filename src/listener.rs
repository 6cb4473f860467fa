//! PostgreSQL notification listener
//!
//! Holds one `LISTEN` subscription on a dedicated connection and surfaces the
//! notifications it receives. A small pool backs the subscription: one
//! connection is taken by the listener, the other serves liveness probes so
//! a probe never has to wait for the listener to be idle.

use crate::config::DatabaseConfig;
use crate::core::{LivenessProbe, NotificationEvent, Subscription};
use crate::dsn::connect_options;
use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgNotification, PgPool, PgPoolOptions};
use sqlx::Connection;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// How long to wait for a pooled connection before giving up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to listen to channel '{channel}': {source}")]
    Listen {
        channel: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("listener connection error: {0}")]
    Transport(#[source] sqlx::Error),

    #[error("failed to ping listener: {0}")]
    Probe(#[source] sqlx::Error),

    #[error("listener connection closed")]
    Closed,
}

/// A `LISTEN` subscription on a PostgreSQL channel.
pub struct PgSubscription {
    listener: PgListener,
    channel: String,
    pool: PgPool,
}

impl PgSubscription {
    /// Connects to the database and subscribes to the configured channel.
    ///
    /// Any failure here is unrecoverable for the process: without the
    /// subscription there is nothing to relay.
    #[instrument(skip_all, fields(channel = %config.channel))]
    pub async fn start(config: &DatabaseConfig) -> Result<Self, ListenerError> {
        let options = connect_options(&config.dsn).map_err(ListenerError::Connect)?;
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_lazy_with(options);

        let mut listener = PgListener::connect_with(&pool)
            .await
            .map_err(ListenerError::Connect)?;
        // A dropped socket must surface as an error, not a silent reconnect.
        listener.eager_reconnect(false);

        listener
            .listen(&config.channel)
            .await
            .map_err(|source| ListenerError::Listen {
                channel: config.channel.clone(),
                source,
            })?;

        info!("Subscribed to channel '{}'", config.channel);
        Ok(Self {
            listener,
            channel: config.channel.clone(),
            pool,
        })
    }
}

#[async_trait]
impl Subscription for PgSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn next_event(&mut self) -> Result<NotificationEvent, ListenerError> {
        to_event(self.listener.try_recv().await)
    }

    fn prober(&self) -> Arc<dyn LivenessProbe> {
        Arc::new(PgProbe {
            pool: self.pool.clone(),
        })
    }
}

/// Maps one `try_recv` result to an event.
///
/// `Ok(None)` means the listener connection was lost. It is fatal: the
/// subscription is never re-established behind the caller's back.
fn to_event(
    received: Result<Option<PgNotification>, sqlx::Error>,
) -> Result<NotificationEvent, ListenerError> {
    match received.map_err(ListenerError::Transport)? {
        Some(notification) => Ok(NotificationEvent::new(
            notification.channel(),
            notification.payload(),
        )),
        None => Err(ListenerError::Closed),
    }
}

/// Pings the database through the subscription's pool.
///
/// The ping runs on the pool's second connection, not on the socket held by
/// the `PgListener`. It shows the database is reachable with the same DSN; a
/// dead LISTEN socket is only detected by `next_event`.
#[derive(Clone, Debug)]
pub struct PgProbe {
    pool: PgPool,
}

#[async_trait]
impl LivenessProbe for PgProbe {
    async fn probe(&self) -> Result<(), ListenerError> {
        let mut conn = self.pool.acquire().await.map_err(ListenerError::Probe)?;
        conn.ping().await.map_err(ListenerError::Probe)?;
        debug!("Listener ping succeeded.");
        Ok(())
    }
}
