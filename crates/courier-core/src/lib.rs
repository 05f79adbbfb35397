//! # Courier Core
//!
//! Shared building blocks for the Courier dispatcher: the message model,
//! the delivery deadline, configuration, errors, and the capability traits
//! implemented by the store and transport adapters.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CourierConfig;
pub use error::{CourierError, DeliveryError, Result};
pub use types::{Deadline, Message, MessageId, NewMessage};
