//! # Domain Layer
//!
//! Pure business model: value objects, aggregates, domain events and the
//! services that combine them. Nothing in here performs I/O.

pub mod entities;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;
