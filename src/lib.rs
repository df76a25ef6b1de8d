//! # Eventos
//!
//! Multi-tenant event management backend: events and registrations, door
//! check-in by QR code, CPF or id, point of sale with stock control,
//! payments with fraud scoring and refunds, a treasury ledger, notifications,
//! a tenant cache and service monitoring, served as a REST API.
//!
//! ## Layers
//!
//! - [`domain`]: value objects, aggregates, domain events and pure rules
//! - [`application`]: use cases orchestrating repositories and adapters
//! - [`infrastructure`]: storage, cache, payment, messaging and PDF adapters
//! - [`api`]: the axum router
//!
//! Every row belongs to a tenant, and every repository call takes the
//! caller's [`TenantId`](domain::value_objects::TenantId).

pub mod api;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;
