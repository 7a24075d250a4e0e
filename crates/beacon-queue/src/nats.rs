//! NATS JetStream transport.
//!
//! Jobs live on a work-queue stream consumed through one durable pull
//! consumer shared by every worker, so each job is handed to a single worker
//! and redelivered if it is never acknowledged. Results go to their own
//! stream and are published with a JetStream acknowledgement.

use crate::error::{QueueError, Result};
use crate::transport::{AckHandle, Delivery, JobConnection, JobTransport};
use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, PullConsumer},
    stream::{self, RetentionPolicy},
    AckKind,
};
use async_trait::async_trait;
use beacon_core::{BrokerConfig, QueueConfig};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::time::Duration;

/// How long one pull request waits for a job before it is renewed.
const PULL_EXPIRY: Duration = Duration::from_secs(30);

/// Connects to a NATS server with JetStream enabled.
#[derive(Debug, Clone)]
pub struct NatsTransport {
    broker: BrokerConfig,
    queue: QueueConfig,
}

impl NatsTransport {
    /// Create a transport for `broker` using the streams named in `queue`.
    #[must_use]
    pub fn new(broker: BrokerConfig, queue: QueueConfig) -> Self {
        Self { broker, queue }
    }

    /// Server URL for the broker.
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("nats://{}", self.broker.address())
    }

    async fn ensure_streams(&self, context: &jetstream::Context) -> Result<PullConsumer> {
        let jobs = context
            .get_or_create_stream(stream::Config {
                name: self.queue.job_stream.clone(),
                subjects: vec![self.queue.job_subject.clone()],
                retention: RetentionPolicy::WorkQueue,
                ..Default::default()
            })
            .await
            .map_err(|e| QueueError::Subscribe(e.to_string()))?;

        context
            .get_or_create_stream(stream::Config {
                name: self.queue.result_stream.clone(),
                subjects: vec![self.queue.result_subject.clone()],
                ..Default::default()
            })
            .await
            .map_err(|e| QueueError::Subscribe(e.to_string()))?;

        jobs.get_or_create_consumer(
            &self.queue.consumer,
            pull::Config {
                durable_name: Some(self.queue.consumer.clone()),
                ack_policy: AckPolicy::Explicit,
                ack_wait: self.queue.ack_wait(),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| QueueError::Subscribe(e.to_string()))
    }
}

#[async_trait]
impl JobTransport for NatsTransport {
    async fn connect(&self) -> Result<Box<dyn JobConnection>> {
        let url = self.server_url();
        tracing::debug!("Connecting to {} as {}", url, self.broker.user);

        let client = async_nats::ConnectOptions::with_user_and_password(
            self.broker.user.clone(),
            self.broker.password.clone(),
        )
        .connect(url.as_str())
        .await
        .map_err(|e| QueueError::Connect(e.to_string()))?;

        let context = jetstream::new(client);
        let consumer = self.ensure_streams(&context).await?;

        tracing::info!(
            "Connected to {}, consuming {} as {}",
            url,
            self.queue.job_subject,
            self.queue.consumer
        );

        Ok(Box::new(NatsConnection {
            context,
            consumer,
            job_subject: self.queue.job_subject.clone(),
            result_subject: self.queue.result_subject.clone(),
        }))
    }
}

/// A JetStream session. Jobs are pulled one per request, only when the
/// previous one is settled, so a connection used only to publish never takes
/// jobs off the queue and a worker never holds more than one.
struct NatsConnection {
    context: jetstream::Context,
    consumer: PullConsumer,
    job_subject: String,
    result_subject: String,
}

async fn publish(context: &jetstream::Context, subject: &str, payload: Bytes) -> Result<()> {
    let publish_failed = |reason: String| QueueError::Publish {
        subject: subject.to_string(),
        reason,
    };

    context
        .publish(subject.to_string(), payload)
        .await
        .map_err(|e| publish_failed(e.to_string()))?
        .await
        .map_err(|e| publish_failed(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl JobConnection for NatsConnection {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        loop {
            let batch = self
                .consumer
                .batch()
                .max_messages(1)
                .expires(PULL_EXPIRY)
                .messages()
                .await
                .map_err(|e| QueueError::Subscribe(e.to_string()))?;
            let mut batch = std::pin::pin!(batch);

            match batch.next().await {
                Some(Ok(message)) => {
                    let payload = message.message.payload.clone();
                    return Ok(Some(Delivery::new(payload, NatsAck(message))));
                }
                Some(Err(e)) => return Err(QueueError::Receive(e.to_string())),
                // Pull request expired without a job
                None => continue,
            }
        }
    }

    async fn publish_result(&mut self, payload: Bytes) -> Result<()> {
        publish(&self.context, &self.result_subject, payload).await
    }

    async fn publish_job(&mut self, payload: Bytes) -> Result<()> {
        publish(&self.context, &self.job_subject, payload).await
    }
}

struct NatsAck(jetstream::Message);

impl NatsAck {
    async fn send(&self, kind: AckKind) -> Result<()> {
        self.0
            .ack_with(kind)
            .await
            .map_err(|e| QueueError::Ack(e.to_string()))
    }
}

#[async_trait]
impl AckHandle for NatsAck {
    async fn ack(&self) -> Result<()> {
        self.send(AckKind::Ack).await
    }

    async fn nak(&self) -> Result<()> {
        self.send(AckKind::Nak(None)).await
    }

    async fn progress(&self) -> Result<()> {
        self.send(AckKind::Progress).await
    }
}
