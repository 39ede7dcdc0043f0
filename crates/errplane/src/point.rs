// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire data model: points, per-metric batches, and the write operations
//! the transports serialize. Field renames carry the wire contract; the
//! rest of the crate works with the typed records only.

use crate::error::ClientError;
use serde::Serialize;
use std::collections::BTreeMap;

pub const MAX_METRIC_NAME_LEN: usize = 255;

/// Caller-supplied key/value tags attached to a point. Ordered so the
/// encoded form is stable across runs.
pub type Dimensions = BTreeMap<String, String>;

/// Wire tag selecting server-side handling of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Raw report ("r").
    Report,
    /// Running sum/count ("c").
    Sum,
    /// Server-side aggregate ("t").
    Aggregate,
}

impl Operation {
    pub fn tag(self) -> &'static str {
        match self {
            Operation::Report => "r",
            Operation::Sum => "c",
            Operation::Aggregate => "t",
        }
    }
}

/// A single metric observation. Immutable once built. Field order fixes
/// the encoded order: c, d, t, v.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Point {
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// Unix seconds. Only the reliable channel carries timestamps.
    #[serde(rename = "t", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(rename = "v")]
    pub value: f64,
}

/// All points pending for one metric name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricBatch {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "p")]
    pub points: Vec<Point>,
}

/// One merged payload bound for a single destination. The reliable channel
/// serializes only `writes` (credentials travel in the URL); the
/// connectionless channel serializes the whole record.
#[derive(Clone, Debug, Serialize)]
pub struct WriteOperation {
    #[serde(rename = "a")]
    pub api_key: String,
    #[serde(rename = "d")]
    pub database: String,
    #[serde(rename = "o", skip_serializing_if = "Option::is_none")]
    pub operation: Option<&'static str>,
    #[serde(rename = "w")]
    pub writes: Vec<MetricBatch>,
}

/// Delivery channel for one submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Reliable, connection-oriented HTTP path.
    Http,
    /// Best-effort, connectionless UDP path.
    Udp,
}

/// One submission: a single-point batch bound for one channel. Created per
/// submission call and consumed exactly once by the worker.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub channel: Channel,
    pub operation: Option<Operation>,
    pub batch: MetricBatch,
}

/// Check a metric name against the naming contract: at most 255 characters,
/// all from [A-Za-z0-9._].
pub fn validate_metric_name(name: &str) -> Result<(), ClientError> {
    if name.len() > MAX_METRIC_NAME_LEN {
        return Err(ClientError::InvalidMetricName(name.to_string()));
    }
    if let Some(invalid_char) = name
        .chars()
        .find(|&ch| !ch.is_ascii_alphanumeric() && ch != '_' && ch != '.')
    {
        tracing::debug!(
            "metric name '{}' rejected: invalid character '{}'",
            name,
            invalid_char
        );
        return Err(ClientError::InvalidMetricName(name.to_string()));
    }
    Ok(())
}

/// Build a single-point envelope, validating the metric name. Empty context
/// and empty dimensions are normalized away so they are omitted on the wire.
pub fn build_envelope(
    channel: Channel,
    operation: Option<Operation>,
    metric: &str,
    value: f64,
    timestamp: Option<i64>,
    context: Option<&str>,
    dimensions: Option<Dimensions>,
) -> Result<Envelope, ClientError> {
    validate_metric_name(metric)?;

    let point = Point {
        context: context.filter(|c| !c.is_empty()).map(str::to_string),
        dimensions: dimensions.filter(|d| !d.is_empty()),
        timestamp,
        value,
    };

    Ok(Envelope {
        channel,
        operation,
        batch: MetricBatch {
            name: metric.to_string(),
            points: vec![point],
        },
    })
}
