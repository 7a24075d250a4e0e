//! Broker abstraction for job consumption and result publishing.
//!
//! The [`JobChannel`](crate::JobChannel) only talks to these traits, so the
//! consume/publish/ack protocol can be exercised without a running broker.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Opens broker sessions.
#[async_trait]
pub trait JobTransport: Send + Sync {
    /// Connect and prepare a session for consuming jobs and publishing results.
    async fn connect(&self) -> Result<Box<dyn JobConnection>>;
}

/// One live broker session.
#[async_trait]
pub trait JobConnection: Send {
    /// Wait for the next job delivery. `None` means the subscription ended.
    async fn next_delivery(&mut self) -> Result<Option<Delivery>>;

    /// Publish a serialized website result.
    async fn publish_result(&mut self, payload: Bytes) -> Result<()>;

    /// Publish a serialized scan job.
    async fn publish_job(&mut self, payload: Bytes) -> Result<()>;
}

/// Settles one delivery with the broker.
#[async_trait]
pub trait AckHandle: Send + Sync {
    /// Mark the delivery as processed.
    async fn ack(&self) -> Result<()>;

    /// Hand the delivery back for immediate redelivery.
    async fn nak(&self) -> Result<()>;

    /// Report that the delivery is still being worked on.
    async fn progress(&self) -> Result<()>;
}

/// A job message received from the broker, not yet acknowledged.
pub struct Delivery {
    payload: Bytes,
    ack: Box<dyn AckHandle>,
}

impl Delivery {
    /// Wrap a received payload with the handle that acknowledges it.
    pub fn new(payload: impl Into<Bytes>, ack: impl AckHandle + 'static) -> Self {
        Self {
            payload: payload.into(),
            ack: Box::new(ack),
        }
    }

    /// Raw message body.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Acknowledge the delivery, consuming it.
    pub async fn ack(self) -> Result<()> {
        self.ack.ack().await
    }

    /// Reject the delivery so the broker hands it out again.
    pub async fn nak(self) -> Result<()> {
        self.ack.nak().await
    }

    /// Extend the delivery's acknowledgement deadline.
    pub async fn progress(&self) -> Result<()> {
        self.ack.progress().await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}
