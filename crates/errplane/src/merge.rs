// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::point::{Channel, Envelope, MetricBatch, Operation, WriteOperation};
use fnv::FnvHashMap;

/// Merge one flush's envelopes into per-destination write operations.
///
/// The reliable channel forms a single group; the connectionless channel
/// forms one group per operation tag, since the tag is per-payload on the
/// wire. Returned in dispatch order: HTTP first, then UDP report,
/// aggregate, sum. Empty groups are never emitted.
pub fn merge_posts(
    api_key: &str,
    database: &str,
    envelopes: Vec<Envelope>,
) -> Vec<(Channel, WriteOperation)> {
    let mut http = Vec::new();
    let mut udp_report = Vec::new();
    let mut udp_aggregate = Vec::new();
    let mut udp_sum = Vec::new();

    for envelope in envelopes {
        match envelope.channel {
            Channel::Http => http.push(envelope.batch),
            Channel::Udp => match envelope.operation {
                Some(Operation::Report) | None => udp_report.push(envelope.batch),
                Some(Operation::Aggregate) => udp_aggregate.push(envelope.batch),
                Some(Operation::Sum) => udp_sum.push(envelope.batch),
            },
        }
    }

    let groups = [
        (Channel::Http, None, http),
        (Channel::Udp, Some(Operation::Report), udp_report),
        (Channel::Udp, Some(Operation::Aggregate), udp_aggregate),
        (Channel::Udp, Some(Operation::Sum), udp_sum),
    ];

    let mut merged = Vec::new();
    for (channel, operation, batches) in groups {
        if batches.is_empty() {
            continue;
        }
        merged.push((
            channel,
            WriteOperation {
                api_key: api_key.to_string(),
                database: database.to_string(),
                operation: operation.map(Operation::tag),
                writes: merge_batches(batches),
            },
        ));
    }
    merged
}

/// Concatenate same-name batches. Points keep arrival order; batch order is
/// first appearance of each metric name.
fn merge_batches(batches: Vec<MetricBatch>) -> Vec<MetricBatch> {
    let mut index: FnvHashMap<String, usize> = FnvHashMap::default();
    let mut merged: Vec<MetricBatch> = Vec::new();

    for batch in batches {
        match index.get(&batch.name) {
            Some(&slot) => merged[slot].points.extend(batch.points),
            None => {
                index.insert(batch.name.clone(), merged.len());
                merged.push(batch);
            }
        }
    }
    merged
}
