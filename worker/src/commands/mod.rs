//! Command implementations.

pub mod enqueue;
pub mod run;
pub mod schedule;

use anyhow::{Context, Result};
use beacon_core::{BrokerConfig, WorkerConfig};
use beacon_queue::NatsTransport;

/// Build the broker transport; credentials must be set in the environment.
fn transport(config: &WorkerConfig) -> Result<NatsTransport> {
    let broker = BrokerConfig::from_env().context("Broker settings are incomplete")?;
    Ok(NatsTransport::new(broker, config.queue.clone()))
}
