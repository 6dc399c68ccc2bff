//! Application message payload.
//!
//! The transport core treats publishes as opaque traffic: routing,
//! topic matching and retention belong to the backend layered above.

use serde::{Deserialize, Serialize};

use crate::error::LoftError;

/// Payload for [`PacketType::Publish`].
///
/// [`PacketType::Publish`]: crate::message::PacketType::Publish
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Publish {
    /// Destination topic.
    pub topic: String,

    /// Application bytes.
    pub payload: Vec<u8>,
}

impl Publish {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Serialize to bytes for packet payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoftError> {
        bincode::serialize(self).map_err(LoftError::from)
    }

    /// Deserialize from packet payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoftError> {
        bincode::deserialize(bytes).map_err(LoftError::from)
    }
}
