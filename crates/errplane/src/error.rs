// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors returned synchronously to submitting callers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid metric name '{0}': must be at most 255 characters of [A-Za-z0-9._]")]
    InvalidMetricName(String),

    #[error("client is closed")]
    Closed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Delivery failures surfaced during a flush. These are logged and the
/// affected payload is dropped; they never stop the worker loop.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("failed to encode payload: {0}")]
    Payload(String),

    #[error("delivery failed (status {0:?}): {1}")]
    Destination(Option<StatusCode>, String),
}
