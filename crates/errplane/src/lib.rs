// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Client-side telemetry buffering and dispatch.
//!
//! Callers submit named metric points; a single background worker batches
//! them and periodically flushes to a remote collector, over HTTP for raw
//! reports expecting acknowledgement and over UDP for counters, aggregates,
//! and low-priority reports. Points sharing a metric name are merged into
//! one payload per flush.
//!
//! Delivery is best-effort and at-most-once: failed flushes are logged and
//! dropped, and nothing is persisted across process restarts. The
//! submission channel is unbounded, so sustained submission bursts grow
//! memory rather than blocking producers.

pub mod batcher_service;
pub mod client;
pub mod config;
pub mod error;
pub mod intake;
pub mod merge;
pub mod point;

pub use client::Errplane;
pub use config::Config;
pub use error::{ClientError, ShippingError};
pub use point::{Dimensions, Operation};
