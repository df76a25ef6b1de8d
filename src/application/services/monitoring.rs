//! # Monitoring
//!
//! Request counters per route and health checks of the components the
//! service depends on.
//!
//! Overall health is the worst component status. The store is critical: if
//! it fails the service is Unhealthy. Cache and payment gateway failures
//! only degrade it, since requests still succeed without them.

use crate::application::services::audit::AuditLog;
use crate::application::services::cache_service::CacheService;
use crate::infrastructure::gateways::PaymentGateway;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

/// Longest a single component check may take.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Health of a component or of the whole service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Serving requests with reduced functionality.
    Degraded,
    /// Not serving requests.
    Unhealthy,
}

impl HealthStatus {
    /// Returns the worse of two statuses.
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }

    /// Returns true unless Unhealthy.
    #[inline]
    #[must_use]
    pub const fn is_serving(self) -> bool {
        !matches!(self, Self::Unhealthy)
    }
}

/// Result of one component check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ComponentHealth {
    /// Component name.
    pub name: String,
    /// Status.
    pub status: HealthStatus,
    /// Time the check took.
    pub latency_ms: u64,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregated health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HealthReport {
    /// Worst component status.
    pub status: HealthStatus,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_secs: u64,
    /// Individual checks.
    pub components: Vec<ComponentHealth>,
}

/// Counters of one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RouteMetrics {
    /// Method and matched path, e.g. `GET /api/v1/events/{id}`.
    pub route: String,
    /// Requests served.
    pub requests: u64,
    /// Responses with a 5xx status.
    pub server_errors: u64,
    /// Responses with a 4xx status.
    pub client_errors: u64,
    /// Mean latency.
    pub avg_latency_ms: f64,
    /// Slowest request.
    pub max_latency_ms: f64,
}

/// Snapshot returned by `GET /monitoring/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MetricsSnapshot {
    /// Seconds since start.
    pub uptime_secs: u64,
    /// Requests over all routes.
    pub total_requests: u64,
    /// 5xx responses over all routes.
    pub total_server_errors: u64,
    /// Per route, busiest first.
    pub routes: Vec<RouteMetrics>,
}

#[derive(Debug, Default)]
struct RouteCounters {
    requests: AtomicU64,
    server_errors: AtomicU64,
    client_errors: AtomicU64,
    total_micros: AtomicU64,
    max_micros: AtomicU64,
}

impl RouteCounters {
    fn snapshot(&self, route: &str) -> RouteMetrics {
        let requests = self.requests.load(Ordering::Relaxed);
        let total = self.total_micros.load(Ordering::Relaxed) as f64;
        RouteMetrics {
            route: route.to_string(),
            requests,
            server_errors: self.server_errors.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            avg_latency_ms: if requests == 0 {
                0.0
            } else {
                total / requests as f64 / 1000.0
            },
            max_latency_ms: self.max_micros.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// Request metrics and health checks.
#[derive(Debug)]
pub struct Monitor {
    started: Instant,
    routes: DashMap<String, RouteCounters>,
    audit: AuditLog,
    cache: CacheService,
    gateway: Arc<dyn PaymentGateway>,
}

impl Monitor {
    /// Creates a monitor over the service's dependencies.
    #[must_use]
    pub fn new(audit: AuditLog, cache: CacheService, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            started: Instant::now(),
            routes: DashMap::new(),
            audit,
            cache,
            gateway,
        }
    }

    /// Seconds since the monitor was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Counts one finished request.
    pub fn record(&self, route: &str, status: u16, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let counters = self.routes.entry(route.to_string()).or_default();
        counters.requests.fetch_add(1, Ordering::Relaxed);
        counters.total_micros.fetch_add(micros, Ordering::Relaxed);
        counters.max_micros.fetch_max(micros, Ordering::Relaxed);
        match status {
            500..=599 => {
                counters.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            400..=499 => {
                counters.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Current counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        let mut routes: Vec<RouteMetrics> = self
            .routes
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect();
        routes.sort_by(|a, b| b.requests.cmp(&a.requests).then_with(|| a.route.cmp(&b.route)));
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            total_requests: routes.iter().map(|r| r.requests).sum(),
            total_server_errors: routes.iter().map(|r| r.server_errors).sum(),
            routes,
        }
    }

    /// Runs every component check concurrently.
    pub async fn health(&self) -> HealthReport {
        let (store, cache, gateway) = tokio::join!(
            check("store", HealthStatus::Unhealthy, async {
                self.audit.count().await.map(|_| ()).map_err(|e| e.to_string())
            }),
            check("cache", HealthStatus::Degraded, async {
                if self.cache.health_check().await {
                    Ok(())
                } else {
                    Err("cache backend unreachable".to_string())
                }
            }),
            check("payment_gateway", HealthStatus::Degraded, async {
                if self.gateway.health_check().await {
                    Ok(())
                } else {
                    Err(format!("{} gateway unreachable", self.gateway.name()))
                }
            }),
        );
        let components = vec![store, cache, gateway];
        let status = components
            .iter()
            .fold(HealthStatus::Healthy, |acc, c| acc.worst(c.status));
        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.uptime_secs(),
            components,
        }
    }
}

/// Times one probe; a failure or a timeout yields `on_failure`.
async fn check<F>(name: &str, on_failure: HealthStatus, probe: F) -> ComponentHealth
where
    F: Future<Output = Result<(), String>>,
{
    let started = Instant::now();
    let outcome = match tokio::time::timeout(CHECK_TIMEOUT, probe).await {
        Ok(result) => result,
        Err(_) => Err(format!("no answer within {}s", CHECK_TIMEOUT.as_secs())),
    };
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match outcome {
        Ok(()) => ComponentHealth {
            name: name.to_string(),
            status: HealthStatus::Healthy,
            latency_ms,
            message: None,
        },
        Err(message) => {
            warn!(component = name, %message, "health check failed");
            ComponentHealth {
                name: name.to_string(),
                status: on_failure,
                latency_ms,
                message: Some(message),
            }
        }
    }
}
