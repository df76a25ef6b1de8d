//! # Bootstrap
//!
//! Turns [`Settings`] into running backends: PostgreSQL or memory storage,
//! Redis or in-process cache, the configured payment provider and the
//! notification senders. Also starts the background loops.

use crate::api::rest::{AppState, Backends, Repositories};
use crate::config::{CacheBackendKind, GatewayKind, Settings};
use crate::infrastructure::cache::{CacheBackend, CacheError, InMemoryCache, RedisCache};
use crate::infrastructure::gateways::{
    GatewayError, HttpPaymentGateway, PaymentGateway, SimulatedGateway,
};
use crate::infrastructure::notifications::{
    DeliveryError, HttpPushSender, HttpSmsSender, LogSender, NotificationSender,
    SmtpEmailSender, SmtpSettings,
};
use crate::infrastructure::persistence::RepositoryError;
use crate::infrastructure::persistence::postgres;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Title of push messages sent without one.
const PUSH_TITLE: &str = "Eventos";

/// Startup failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Database unreachable or migration failed.
    #[error("database: {0}")]
    Database(#[from] RepositoryError),

    /// Cache unreachable.
    #[error("cache: {0}")]
    Cache(#[from] CacheError),

    /// Payment provider misconfigured.
    #[error("payment gateway: {0}")]
    Gateway(#[from] GatewayError),

    /// Notification provider misconfigured.
    #[error("notifications: {0}")]
    Notifications(#[from] DeliveryError),
}

/// What [`start`] returns.
#[derive(Debug)]
pub struct Runtime {
    /// Router state.
    pub state: AppState,
    /// Background loops; aborted on shutdown.
    pub tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Stops the background loops.
    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Connects every backend, builds the state and starts background loops.
///
/// # Errors
///
/// Returns `BootstrapError` if a configured backend cannot be reached or
/// configured.
pub async fn start(settings: &Settings) -> Result<Runtime, BootstrapError> {
    let repositories = match &settings.database.url {
        Some(url) => {
            let pool = postgres::connect(url, settings.database.max_connections).await?;
            if settings.database.run_migrations {
                postgres::migrate(&pool).await?;
                info!("database migrations applied");
            }
            info!("using PostgreSQL storage");
            Repositories::postgres(pool)
        }
        None => {
            warn!("no database.url configured, data is kept in memory only");
            Repositories::in_memory()
        }
    };

    let mut tasks = Vec::new();
    let cache: Arc<dyn CacheBackend> = match (settings.cache.backend, &settings.cache.redis_url) {
        (CacheBackendKind::Redis, Some(url)) => {
            info!("using Redis cache");
            Arc::new(RedisCache::connect(url).await?)
        }
        _ => {
            let memory = Arc::new(InMemoryCache::new(
                settings.cache.capacity,
                settings.cache.eviction,
            ));
            if let Some(task) = spawn_purge_loop(&memory, settings.cache.purge_interval_secs) {
                tasks.push(task);
            }
            memory
        }
    };

    let backends = Backends {
        repositories,
        cache,
        gateway: gateway(settings)?,
        senders: senders(settings)?,
    };
    let state = AppState::build(settings, backends);
    if let Some(task) = Arc::clone(&state.treasury).spawn_sweep_loop() {
        tasks.push(task);
    }
    Ok(Runtime { state, tasks })
}

fn gateway(settings: &Settings) -> Result<Arc<dyn PaymentGateway>, BootstrapError> {
    let payments = &settings.payments;
    match (payments.gateway, &payments.base_url, &payments.api_key) {
        (GatewayKind::Http, Some(url), Some(key)) => {
            info!(%url, "using HTTP payment gateway");
            Ok(Arc::new(HttpPaymentGateway::new(
                url.clone(),
                key,
                payments.timeout_ms,
            )?))
        }
        _ => {
            warn!("using the simulated payment gateway");
            Ok(Arc::new(SimulatedGateway::new()))
        }
    }
}

fn senders(settings: &Settings) -> Result<Vec<Arc<dyn NotificationSender>>, BootstrapError> {
    let config = &settings.notifications;
    let log: Arc<dyn NotificationSender> = Arc::new(LogSender::new());
    let mut senders = vec![log];
    if let Some(smtp) = &config.smtp {
        let sender = SmtpEmailSender::new(&SmtpSettings {
            host: smtp.host.clone(),
            port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from: smtp.from.clone(),
            starttls: smtp.starttls,
        })?;
        senders.push(Arc::new(sender));
    }
    if let Some(sms) = &config.sms {
        senders.push(Arc::new(HttpSmsSender::new(
            &sms.base_url,
            &sms.api_key,
            sms.timeout_ms,
        )?));
    }
    if let Some(push) = &config.push {
        senders.push(Arc::new(HttpPushSender::new(
            &push.base_url,
            &push.api_key,
            PUSH_TITLE,
            push.timeout_ms,
        )?));
    }
    Ok(senders)
}

/// Sweeps expired entries of the in-process cache every `interval_secs`.
/// Returns `None` when the interval is zero.
fn spawn_purge_loop(cache: &Arc<InMemoryCache>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }
    let cache = Arc::clone(cache);
    let period = Duration::from_secs(interval_secs);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(purged, "expired cache entries removed");
            }
        }
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_start_in_memory() {
        let mut settings = Settings::default();
        settings.treasury.sweep_interval_secs = 0;
        settings.cache.purge_interval_secs = 0;
        let runtime = start(&settings).await.unwrap();
        assert!(runtime.tasks.is_empty());
        assert_eq!(runtime.state.payments.gateway_name(), "simulated");
        runtime.shutdown();
    }

    #[tokio::test]
    async fn background_loops_are_spawned() {
        let runtime = start(&Settings::default()).await.unwrap();
        assert_eq!(runtime.tasks.len(), 2);
        runtime.shutdown();
    }
}
