//! Public client surface: submission entry points, heartbeats, and
//! lifecycle control over the batching worker.

use crate::batcher_service::{BatcherHandle, BatcherService};
use crate::config::Config;
use crate::error::ClientError;
use crate::point::{build_envelope, Channel, Dimensions, Operation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Telemetry client. Submissions are cheap and non-blocking; a dedicated
/// background worker owns batching and delivery. Delivery is best-effort
/// and at-most-once: a failed flush drops its payload.
///
/// Must be created inside a tokio runtime. [`Errplane::close`] guarantees
/// every point accepted before the call is flushed before it returns.
pub struct Errplane {
    handle: BatcherHandle,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    heartbeats: CancellationToken,
}

impl Errplane {
    /// Validate the configuration and start the background worker.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        config.validate()?;

        let (service, handle) = BatcherService::new(&config);
        let worker = tokio::spawn(service.run());

        Ok(Errplane {
            handle,
            worker: Mutex::new(Some(worker)),
            closed: AtomicBool::new(false),
            heartbeats: CancellationToken::new(),
        })
    }

    /// Submit one point over the reliable channel, stamped with the given
    /// timestamp.
    pub fn report(
        &self,
        metric: &str,
        value: f64,
        timestamp: SystemTime,
        context: Option<&str>,
        dimensions: Option<Dimensions>,
    ) -> Result<(), ClientError> {
        self.post(
            Channel::Http,
            None,
            metric,
            value,
            Some(unix_seconds(timestamp)),
            context,
            dimensions,
        )
    }

    /// Submit one low-priority raw report over the connectionless channel.
    pub fn report_udp(
        &self,
        metric: &str,
        value: f64,
        context: Option<&str>,
        dimensions: Option<Dimensions>,
    ) -> Result<(), ClientError> {
        self.post(
            Channel::Udp,
            Some(Operation::Report),
            metric,
            value,
            None,
            context,
            dimensions,
        )
    }

    /// Add to a server-side running sum.
    pub fn sum(
        &self,
        metric: &str,
        value: i64,
        context: Option<&str>,
        dimensions: Option<Dimensions>,
    ) -> Result<(), ClientError> {
        self.post(
            Channel::Udp,
            Some(Operation::Sum),
            metric,
            value as f64,
            None,
            context,
            dimensions,
        )
    }

    /// Submit a value for server-side aggregation.
    pub fn aggregate(
        &self,
        metric: &str,
        value: f64,
        context: Option<&str>,
        dimensions: Option<Dimensions>,
    ) -> Result<(), ClientError> {
        self.post(
            Channel::Udp,
            Some(Operation::Aggregate),
            metric,
            value,
            None,
            context,
            dimensions,
        )
    }

    /// Spawn a periodic task reporting `1.0` for `metric` every `interval`
    /// over the reliable channel. Stops when the client closes.
    pub fn heartbeat(
        &self,
        metric: &str,
        interval: Duration,
        context: Option<&str>,
        dimensions: Option<Dimensions>,
    ) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        crate::point::validate_metric_name(metric)?;

        let handle = self.handle.clone();
        let token = self.heartbeats.clone();
        let metric = metric.to_string();
        let context = context.map(str::to_string);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick is instantaneous, discard it

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let envelope = build_envelope(
                            Channel::Http,
                            None,
                            &metric,
                            1.0,
                            Some(unix_seconds(SystemTime::now())),
                            context.as_deref(),
                            dimensions.clone(),
                        );
                        match envelope {
                            Ok(envelope) => {
                                if handle.post(envelope).is_err() {
                                    break;
                                }
                            }
                            // Name was validated above; nothing recoverable here.
                            Err(e) => {
                                error!("Failed to build heartbeat point: {e}");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Force a flush of everything pending and wait for its transport
    /// calls to return.
    pub async fn flush(&self) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        self.handle.flush().await.map_err(|_| ClientError::Closed)
    }

    /// Close the client: stop heartbeats, flush all buffered points, and
    /// wait for the worker to terminate. Idempotent. Submissions after
    /// this call fail with [`ClientError::Closed`].
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.heartbeats.cancel();

        if let Err(e) = self.handle.shutdown().await {
            error!("Error while shutting down batcher service: {e}");
        }

        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                error!("Batcher service task failed: {e}");
            }
        }
    }

    fn post(
        &self,
        channel: Channel,
        operation: Option<Operation>,
        metric: &str,
        value: f64,
        timestamp: Option<i64>,
        context: Option<&str>,
        dimensions: Option<Dimensions>,
    ) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let envelope =
            build_envelope(channel, operation, metric, value, timestamp, context, dimensions)?;
        self.handle.post(envelope).map_err(|_| ClientError::Closed)
    }
}

fn unix_seconds(timestamp: SystemTime) -> i64 {
    // Pre-epoch timestamps clamp to zero.
    timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
