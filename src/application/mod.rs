//! # Application Layer
//!
//! Use cases that coordinate the domain model with persistence, gateways,
//! notification senders and the cache.

pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult, InfrastructureError};
