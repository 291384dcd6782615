pub mod connection;
pub mod manager;

pub use connection::{Connection, ConnectionState, InboundEvent, Role};
pub use manager::{ConnectionEvents, ConnectionManager};
