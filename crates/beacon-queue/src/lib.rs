//! Beacon Queue - Scan job transport.
//!
//! Consumes scan jobs from the broker, runs them through a [`JobHandler`]
//! and publishes one result message per job. Jobs are acknowledged only
//! after their result is published, so a worker that dies mid-scan leaves
//! the job for redelivery. Every job message gets a result, including
//! payloads that cannot be decoded.
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_queue::{JobChannel, NatsTransport};
//! use std::sync::Arc;
//!
//! let transport = NatsTransport::new(broker, config.queue.clone());
//! let channel = JobChannel::new(Arc::new(transport), Arc::new(orchestrator), config.queue.reconnect_delay());
//! channel.run().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod channel;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod memory;
pub mod nats;
pub mod transport;

pub use channel::{enqueue_job, enqueue_jobs, JobChannel, JobHandler, DEFAULT_PROGRESS_INTERVAL};
pub use error::{QueueError, Result};
pub use memory::{MemoryTransport, PublishedMessage};
pub use nats::NatsTransport;
pub use transport::{AckHandle, Delivery, JobConnection, JobTransport};
