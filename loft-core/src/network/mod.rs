//! Connection transport layer.

pub mod connection;

pub use connection::{Carrier, Connection, FLUSH_DELAY};
