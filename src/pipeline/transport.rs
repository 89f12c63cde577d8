// Message transport: the `send(identity, text)` contract to whatever store
// persists and fans out chat messages.
//
// Persistence, ordering and delivery to other clients belong to the store.
// MemoryTransport keeps dispatched messages in a Vec for the CLI and tests.

use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A message as handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub identity: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Trait for message stores. Implementations must be async because real
/// stores are remote.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, identity: &str, text: &str) -> Result<OutgoingMessage>;
}

/// Transport that records messages in memory.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub fn messages(&self) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn send(&self, identity: &str, text: &str) -> Result<OutgoingMessage> {
        let message = OutgoingMessage {
            identity: identity.to_string(),
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(message)
    }
}
