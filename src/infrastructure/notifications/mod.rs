//! # Notification Senders
//!
//! Provider adapters behind the [`NotificationSender`] port.

pub mod email;
pub mod logging;
pub mod push;
pub mod sms;
pub mod traits;

pub use email::{SmtpEmailSender, SmtpSettings};
pub use logging::LogSender;
pub use push::HttpPushSender;
pub use sms::HttpSmsSender;
pub use traits::{DeliveryError, DeliveryResult, NotificationSender};
