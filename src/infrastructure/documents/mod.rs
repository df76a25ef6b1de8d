//! # Documents
//!
//! Printable artifacts generated on request.

pub mod ticket_pdf;

pub use ticket_pdf::{DocumentError, TicketContent, render_ticket};
