//! In-memory transport for tests and local runs.
//!
//! Behaves like a single work queue: published jobs become deliveries and
//! results are recorded for inspection. A delivery that is rejected, or
//! dropped without being settled, goes back to the front of the queue the way
//! an expired JetStream ack deadline would hand it out again. Connect and
//! publish failures can be injected to exercise the reconnect path.

use crate::error::{QueueError, Result};
use crate::transport::{AckHandle, Delivery, JobConnection, JobTransport};
use async_trait::async_trait;
use beacon_core::QueueConfig;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A message published through the transport.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

#[derive(Default)]
struct MemoryState {
    queue: QueueConfig,
    pending: Mutex<VecDeque<(u64, Bytes)>>,
    published: Mutex<Vec<PublishedMessage>>,
    acked: Mutex<Vec<u64>>,
    naks: AtomicUsize,
    progress: AtomicUsize,
    redeliveries: AtomicUsize,
    next_id: AtomicU64,
    connects: AtomicUsize,
    failing_connects: AtomicUsize,
    fail_publishes: AtomicBool,
}

/// Transport backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<MemoryState>,
}

impl MemoryTransport {
    /// Create an empty transport using the default subjects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw job payload for delivery.
    pub fn push_job(&self, payload: impl Into<Bytes>) {
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        self.state
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back((id, payload.into()));
    }

    /// Make the next `count` connection attempts fail.
    pub fn fail_next_connects(&self, count: usize) {
        self.state.failing_connects.store(count, Ordering::SeqCst);
    }

    /// Make every publish fail until switched off.
    pub fn fail_publishes(&self, fail: bool) {
        self.state.fail_publishes.store(fail, Ordering::SeqCst);
    }

    /// Number of connection attempts so far, failed ones included.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Number of acknowledged deliveries.
    #[must_use]
    pub fn ack_count(&self) -> usize {
        self.state
            .acked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Number of rejected deliveries.
    #[must_use]
    pub fn nak_count(&self) -> usize {
        self.state.naks.load(Ordering::SeqCst)
    }

    /// Number of in-progress heartbeats received.
    #[must_use]
    pub fn progress_count(&self) -> usize {
        self.state.progress.load(Ordering::SeqCst)
    }

    /// Number of deliveries put back on the queue, rejected or abandoned.
    #[must_use]
    pub fn redelivery_count(&self) -> usize {
        self.state.redeliveries.load(Ordering::SeqCst)
    }

    /// Number of jobs waiting for delivery.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// All published messages, in publish order.
    #[must_use]
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.state
            .published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Payloads published to the result subject.
    #[must_use]
    pub fn published_results(&self) -> Vec<Bytes> {
        self.messages_for_subject(&self.state.queue.result_subject)
    }

    /// Payloads published to the job subject.
    #[must_use]
    pub fn published_jobs(&self) -> Vec<Bytes> {
        self.messages_for_subject(&self.state.queue.job_subject)
    }

    fn messages_for_subject(&self, subject: &str) -> Vec<Bytes> {
        self.published_messages()
            .into_iter()
            .filter(|m| m.subject == subject)
            .map(|m| m.payload)
            .collect()
    }
}

#[async_trait]
impl JobTransport for MemoryTransport {
    async fn connect(&self) -> Result<Box<dyn JobConnection>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);

        let failing = self.state.failing_connects.load(Ordering::SeqCst);
        if failing > 0 {
            self.state
                .failing_connects
                .store(failing - 1, Ordering::SeqCst);
            return Err(QueueError::Connect("connection refused".to_string()));
        }

        Ok(Box::new(MemoryConnection {
            transport: self.clone(),
        }))
    }
}

struct MemoryConnection {
    transport: MemoryTransport,
}

impl MemoryConnection {
    fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        let state = &self.transport.state;
        if state.fail_publishes.load(Ordering::SeqCst) {
            return Err(QueueError::Publish {
                subject: subject.to_string(),
                reason: "no responders".to_string(),
            });
        }
        state
            .published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage {
                subject: subject.to_string(),
                payload,
            });
        Ok(())
    }
}

#[async_trait]
impl JobConnection for MemoryConnection {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        let next = self
            .transport
            .state
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        Ok(next.map(|(id, payload)| {
            let ack = MemoryAck {
                id,
                payload: payload.clone(),
                state: Arc::clone(&self.transport.state),
                settled: AtomicBool::new(false),
            };
            Delivery::new(payload, ack)
        }))
    }

    async fn publish_result(&mut self, payload: Bytes) -> Result<()> {
        let subject = self.transport.state.queue.result_subject.clone();
        self.publish(&subject, payload)
    }

    async fn publish_job(&mut self, payload: Bytes) -> Result<()> {
        let subject = self.transport.state.queue.job_subject.clone();
        self.publish(&subject, payload.clone())?;
        self.transport.push_job(payload);
        Ok(())
    }
}

struct MemoryAck {
    id: u64,
    payload: Bytes,
    state: Arc<MemoryState>,
    settled: AtomicBool,
}

impl MemoryAck {
    /// Returns false if the delivery was already acked or rejected.
    fn settle(&self) -> bool {
        !self.settled.swap(true, Ordering::SeqCst)
    }

    fn requeue(&self) {
        self.state.redeliveries.fetch_add(1, Ordering::SeqCst);
        self.state
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_front((self.id, self.payload.clone()));
    }
}

#[async_trait]
impl AckHandle for MemoryAck {
    async fn ack(&self) -> Result<()> {
        if !self.settle() {
            return Err(QueueError::Ack(format!("delivery {} already settled", self.id)));
        }
        self.state
            .acked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(self.id);
        Ok(())
    }

    async fn nak(&self) -> Result<()> {
        if !self.settle() {
            return Err(QueueError::Ack(format!("delivery {} already settled", self.id)));
        }
        self.state.naks.fetch_add(1, Ordering::SeqCst);
        self.requeue();
        Ok(())
    }

    async fn progress(&self) -> Result<()> {
        self.state.progress.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryAck {
    fn drop(&mut self) {
        if self.settle() {
            self.requeue();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_published_job_becomes_delivery() {
        let transport = MemoryTransport::new();
        let mut connection = transport.connect().await.unwrap();

        connection
            .publish_job(Bytes::from_static(b"{}"))
            .await
            .unwrap();
        assert_eq!(transport.published_jobs().len(), 1);
        assert_eq!(transport.pending_count(), 1);

        let delivery = connection.next_delivery().await.unwrap().unwrap();
        assert_eq!(delivery.payload(), b"{}");
        delivery.ack().await.unwrap();

        assert_eq!(transport.ack_count(), 1);
        assert!(connection.next_delivery().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nak_puts_delivery_back_first() {
        let transport = MemoryTransport::new();
        transport.push_job(Bytes::from_static(b"first"));
        transport.push_job(Bytes::from_static(b"second"));
        let mut connection = transport.connect().await.unwrap();

        let delivery = connection.next_delivery().await.unwrap().unwrap();
        delivery.nak().await.unwrap();

        let again = connection.next_delivery().await.unwrap().unwrap();
        assert_eq!(again.payload(), b"first");
        again.ack().await.unwrap();

        assert_eq!(transport.nak_count(), 1);
        assert_eq!(transport.ack_count(), 1);
        assert_eq!(transport.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_delivery_is_redelivered_to_next_session() {
        let transport = MemoryTransport::new();
        transport.push_job(Bytes::from_static(b"job"));

        let mut lost = transport.connect().await.unwrap();
        let delivery = lost.next_delivery().await.unwrap().unwrap();
        delivery.progress().await.unwrap();
        drop(delivery);
        drop(lost);

        let mut connection = transport.connect().await.unwrap();
        let delivery = connection.next_delivery().await.unwrap().unwrap();
        assert_eq!(delivery.payload(), b"job");
        delivery.ack().await.unwrap();

        assert_eq!(transport.redelivery_count(), 1);
        assert_eq!(transport.progress_count(), 1);
        assert_eq!(transport.ack_count(), 1);
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_acked_delivery_is_not_redelivered() {
        let transport = MemoryTransport::new();
        transport.push_job(Bytes::from_static(b"job"));
        let mut connection = transport.connect().await.unwrap();

        connection
            .next_delivery()
            .await
            .unwrap()
            .unwrap()
            .ack()
            .await
            .unwrap();

        assert_eq!(transport.redelivery_count(), 0);
        assert!(connection.next_delivery().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_connect_failures() {
        let transport = MemoryTransport::new();
        transport.fail_next_connects(1);

        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_ok());
        assert_eq!(transport.connect_count(), 2);
    }
}
