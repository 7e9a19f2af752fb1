//! Domain operations shared by the bot and the web API, plus the process
//! configuration and the notification queue.

pub mod access;
pub mod config;
pub mod demo;
pub mod error;
pub mod format;
pub mod logistics;
pub mod notify;
pub mod session;
pub mod tracking;

pub use config::{Config, ConfigError};
pub use error::{OpError, OpResult};
pub use logistics::{Logistics, OfferInput, Settings};
pub use notify::{Notification, NotificationSink, Notifier, run_worker};
pub use parcel_db::{Database, OrderFilter};
