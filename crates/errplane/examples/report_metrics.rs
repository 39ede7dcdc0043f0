// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Minimal usage: report one point, stream a few aggregates, close.
//!
//! Expects `ERRPLANE_APP_KEY`, `ERRPLANE_ENVIRONMENT` and
//! `ERRPLANE_API_KEY` in the environment.

use errplane::{Config, Dimensions, Errplane};
use std::time::{Duration, SystemTime};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new("debug").expect("could not parse log level"))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::from_env().expect("incomplete ERRPLANE_* environment");
    let client = Errplane::new(config).expect("client creation failed");

    let mut dimensions = Dimensions::new();
    dimensions.insert("foo".to_string(), "bar".to_string());

    client
        .report(
            "some_metric",
            123.4,
            SystemTime::now(),
            Some("some_context"),
            Some(dimensions),
        )
        .expect("report failed");

    for i in 0..10 {
        client
            .aggregate("some_aggregate", f64::from(i) * 10.0, None, None)
            .expect("aggregate failed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Flushes everything still buffered before returning.
    client.close().await;
}
