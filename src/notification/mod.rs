//! Notification module
//!
//! Post-commit delivery of transfer notices to both parties.

mod dispatcher;
mod mailer;

pub use dispatcher::{deliver_with_retry, NotificationDispatcher, NotificationWorker};
pub use mailer::{compose_notices, Contact, DeliveryError, LogMailer, Mailer, Notice, NoticeKind};
