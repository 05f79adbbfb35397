//! Capability traits consumed by the dispatch core.

pub mod delivery;
pub mod executor;
pub mod store;

pub use delivery::DeliveryClient;
pub use executor::TickExecutor;
pub use store::MessageStore;
