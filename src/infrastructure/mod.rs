//! # Infrastructure Layer
//!
//! Adapters to the outside world behind the ports the application layer
//! depends on.
//!
//! - [`persistence`]: repositories and the audit event store
//! - [`cache`]: in-process and Redis cache backends
//! - [`gateways`]: payment providers and webhook signatures
//! - [`notifications`]: e-mail, SMS and push senders
//! - [`documents`]: printable tickets

pub mod cache;
pub mod documents;
pub mod gateways;
pub mod notifications;
pub mod persistence;
