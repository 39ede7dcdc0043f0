// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Actor-based batching worker. Cloneable handles post envelopes over an
//! unbounded channel; a single service task owns the pending buffer and the
//! transports, so flushes never contend with producers.

use crate::config::Config;
use crate::intake::Intake;
use crate::merge::merge_posts;
use crate::point::{Channel, Envelope};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration};
use tracing::{debug, error};

/// Flush as soon as this many submissions are pending, without waiting for
/// the timer.
pub const MAX_PENDING_POSTS: usize = 100;

/// Timer-driven flush interval.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum BatcherCommand {
    /// Append one submission to the pending buffer.
    Post(Envelope),

    /// Flush whatever is pending and acknowledge completion.
    Flush(oneshot::Sender<()>),

    /// Flush whatever is pending, acknowledge, and stop the service.
    Shutdown(oneshot::Sender<()>),
}

/// Handle for sending commands to the batcher service. Cloneable; safe to
/// use from any number of producer tasks concurrently.
#[derive(Clone, Debug)]
pub struct BatcherHandle {
    tx: mpsc::UnboundedSender<BatcherCommand>,
}

impl BatcherHandle {
    /// Enqueue one submission (non-blocking).
    pub fn post(&self, envelope: Envelope) -> Result<(), mpsc::error::SendError<BatcherCommand>> {
        self.tx.send(BatcherCommand::Post(envelope))
    }

    /// Force a flush and wait until its transport calls have returned.
    pub async fn flush(&self) -> Result<(), String> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(BatcherCommand::Flush(response_tx))
            .map_err(|e| format!("failed to send flush command: {e}"))?;

        response_rx
            .await
            .map_err(|e| format!("failed to receive flush response: {e}"))
    }

    /// Drain and stop the service. Resolves once the terminal flush has
    /// completed; points accepted before this call are part of it.
    pub async fn shutdown(&self) -> Result<(), String> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(BatcherCommand::Shutdown(response_tx))
            .map_err(|e| format!("failed to send shutdown command: {e}"))?;

        response_rx
            .await
            .map_err(|e| format!("failed to receive shutdown response: {e}"))
    }
}

/// Batcher service that owns the pending buffer and processes commands.
/// Spawn [`BatcherService::run`] as a tokio task.
pub struct BatcherService {
    api_key: String,
    database: String,
    intake: Intake,
    rx: mpsc::UnboundedReceiver<BatcherCommand>,
}

impl BatcherService {
    pub fn new(config: &Config) -> (Self, BatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        let service = Self {
            api_key: config.api_key.clone(),
            database: config.database(),
            intake: Intake::new(config),
            rx,
        };
        let handle = BatcherHandle { tx };

        (service, handle)
    }

    /// Run the service until a shutdown command arrives or every handle is
    /// dropped. Either way the pending buffer is drained before exiting.
    pub async fn run(mut self) {
        debug!("Batcher service started");

        let mut pending: Vec<Envelope> = Vec::new();
        let mut ticker = interval(FLUSH_INTERVAL);
        ticker.tick().await; // first tick is instantaneous, discard it

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(BatcherCommand::Post(envelope)) => {
                        pending.push(envelope);
                        if pending.len() >= MAX_PENDING_POSTS {
                            self.flush_pending(&mut pending).await;
                            ticker.reset();
                        }
                    }
                    Some(BatcherCommand::Flush(response_tx)) => {
                        self.flush_pending(&mut pending).await;
                        ticker.reset();
                        if response_tx.send(()).is_err() {
                            error!("Failed to send flush response - receiver dropped");
                        }
                    }
                    Some(BatcherCommand::Shutdown(response_tx)) => {
                        debug!("Batcher service shutting down");
                        self.flush_pending(&mut pending).await;
                        if response_tx.send(()).is_err() {
                            error!("Failed to send shutdown response - receiver dropped");
                        }
                        break;
                    }
                    None => {
                        self.flush_pending(&mut pending).await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.flush_pending(&mut pending).await;
                }
            }
        }

        debug!("Batcher service stopped");
    }

    /// Merge and dispatch the pending buffer. Delivery failures are logged
    /// and dropped; one failing group never blocks the others.
    async fn flush_pending(&self, pending: &mut Vec<Envelope>) {
        if pending.is_empty() {
            return;
        }
        let posts = std::mem::take(pending);
        debug!("Flushing {} pending submissions", posts.len());

        for (channel, operation) in merge_posts(&self.api_key, &self.database, posts) {
            let result = match channel {
                Channel::Http => self.intake.ship_points(&operation).await,
                Channel::Udp => self.intake.ship_datagram(&operation).await,
            };
            if let Err(e) = result {
                error!("Error while posting points to the collector: {e}");
            }
        }
    }
}
