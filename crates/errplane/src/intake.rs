// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::Config;
use crate::error::ShippingError;
use crate::point::WriteOperation;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::error;

/// Sends merged payloads to the collector endpoints. One instance lives
/// inside the worker for the client's lifetime; nothing here is shared
/// with producers. Neither path retries: a failed send drops the payload.
pub struct Intake {
    client: reqwest::Client,
    collector_url: String,
    aggregator_addr: String,
    timeout: Duration,
}

impl Intake {
    pub fn new(config: &Config) -> Self {
        Intake {
            client: build_client(config),
            collector_url: config.collector_url(),
            aggregator_addr: config.aggregator_addr.clone(),
            timeout: config.timeout,
        }
    }

    /// POST merged batches to the collector over the reliable channel. The
    /// API key and database identifier travel in the URL; the body is the
    /// bare batch array. 201 is the only success status.
    pub async fn ship_points(&self, operation: &WriteOperation) -> Result<(), ShippingError> {
        let body = serde_json::to_vec(&operation.writes)
            .map_err(|e| ShippingError::Payload(e.to_string()))?;

        let resp = self
            .client
            .post(&self.collector_url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ShippingError::Destination(e.status(), e.to_string()))?;

        match resp.status() {
            StatusCode::CREATED => Ok(()),
            unexpected_status_code => Err(ShippingError::Destination(
                Some(unexpected_status_code),
                format!("collector returned status {unexpected_status_code}"),
            )),
        }
    }

    /// Send the full write operation as one best-effort datagram over the
    /// connectionless channel. No acknowledgement.
    pub async fn ship_datagram(&self, operation: &WriteOperation) -> Result<(), ShippingError> {
        let body = serde_json::to_vec(operation)
            .map_err(|e| ShippingError::Payload(e.to_string()))?;

        let send = async {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket
                .send_to(&body, self.aggregator_addr.as_str())
                .await?;
            Ok::<(), std::io::Error>(())
        };

        tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| {
                ShippingError::Destination(None, "datagram send timed out".to_string())
            })?
            .map_err(|e| ShippingError::Destination(None, e.to_string()))
    }
}

fn build_client(config: &Config) -> reqwest::Client {
    match build_client_inner(config) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to apply HTTP client configuration: {}, using defaults",
                e
            );
            reqwest::Client::new()
        }
    }
}

fn build_client_inner(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(config.timeout);

    if let Some(proxy_url) = &config.https_proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    builder.build()
}
