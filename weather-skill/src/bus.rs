//! Event envelope and the host bus seam.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// A message travelling over the host bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,

    #[serde(default)]
    pub payload: serde_json::Value,

    /// Who the event is on behalf of (user, device, session...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    pub emitted_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        topic: impl Into<String>,
        payload: serde_json::Value,
        source: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload,
            actor: None,
            source: source.into(),
            trace_id: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn emit(&self, event: Event) -> Result<()>;
}

/// In-process bus on top of `tokio::sync::broadcast`.
pub struct BroadcastBus {
    sender: broadcast::Sender<Arc<Event>>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EventBus for BroadcastBus {
    async fn emit(&self, event: Event) -> Result<()> {
        // No receivers is not an error for a fire-and-forget bus.
        let _ = self.sender.send(Arc::new(event));
        Ok(())
    }
}
