//! Notification collaborator for the clinic core.
//!
//! The core emits notification requests for lifecycle events (invite issued,
//! registration received, approval decisions). This crate owns the seam: the
//! [`Notifier`] trait, the rendered [`Notification`] shape, and the message
//! templates. Actual delivery (SMTP, queues) lives behind the trait and is
//! out of scope here.

pub mod dispatch;
pub mod templates;

pub use dispatch::*;
pub use templates::*;
