// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use errplane::{Config, Dimensions, Errplane};
use mockito::{Matcher, Server};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn dimensions(pairs: &[(&str, &str)]) -> Dimensions {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn http_config(server: &Server) -> Config {
    Config::new("app4you2love", "staging", "some_key")
        .with_scheme("http")
        .with_collector_host(&server.host_with_port())
        .with_timeout(Duration::from_secs(5))
}

async fn udp_recorder() -> (UdpSocket, String) {
    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("unable to bind UDP socket");
    let addr = socket.local_addr().expect("no local addr").to_string();
    (socket, addr)
}

async fn recv_datagram(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 2048];
    let (n, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for datagram")
        .expect("recv failed");
    String::from_utf8_lossy(&buf[..n]).to_string()
}

#[tokio::test]
async fn collector_receives_merged_report_bodies() {
    let mut server = Server::new_async().await;

    let t0 = 1_700_000_000i64;
    let expected_body = format!(
        r#"[{{"n":"some_metric","p":[{{"c":"some_context","d":{{"foo":"bar"}},"t":{t0},"v":123.4}},{{"c":"different_context","d":{{"foo":"bar"}},"t":{t0},"v":567.8}}]}},{{"n":"different_metric","p":[{{"c":"some_context","d":{{"foo":"bar"}},"t":{t0},"v":123.4}}]}}]"#
    );
    let mock = server
        .mock("POST", "/databases/app4you2lovestaging/points")
        .match_query(Matcher::UrlEncoded("api_key".into(), "some_key".into()))
        .match_body(expected_body.as_str())
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let client = Errplane::new(http_config(&server)).expect("client creation failed");
    let timestamp = UNIX_EPOCH + Duration::from_secs(t0 as u64);

    client
        .report(
            "some_metric",
            123.4,
            timestamp,
            Some("some_context"),
            Some(dimensions(&[("foo", "bar")])),
        )
        .expect("report failed");
    client
        .report(
            "some_metric",
            567.8,
            timestamp,
            Some("different_context"),
            Some(dimensions(&[("foo", "bar")])),
        )
        .expect("report failed");
    client
        .report(
            "different_metric",
            123.4,
            timestamp,
            Some("some_context"),
            Some(dimensions(&[("foo", "bar")])),
        )
        .expect("report failed");

    // Close flushes everything pending as a single body.
    client.close().await;

    mock.assert_async().await;
}

#[tokio::test]
async fn aggregator_receives_one_tagged_datagram_per_operation() {
    let (socket, addr) = udp_recorder().await;
    let config = Config::new("app4you2love", "staging", "some_key").with_aggregator_addr(&addr);
    let client = Errplane::new(config).expect("client creation failed");

    client
        .report_udp(
            "some_metric",
            123.4,
            Some("some_context"),
            Some(dimensions(&[("foo", "bar")])),
        )
        .expect("report_udp failed");
    client.flush().await.expect("flush failed");
    assert_eq!(
        recv_datagram(&socket).await,
        r#"{"a":"some_key","d":"app4you2lovestaging","o":"r","w":[{"n":"some_metric","p":[{"c":"some_context","d":{"foo":"bar"},"v":123.4}]}]}"#
    );

    client
        .sum(
            "some_metric",
            10,
            Some("some_context"),
            Some(dimensions(&[("foo", "bar")])),
        )
        .expect("sum failed");
    client.flush().await.expect("flush failed");
    assert_eq!(
        recv_datagram(&socket).await,
        r#"{"a":"some_key","d":"app4you2lovestaging","o":"c","w":[{"n":"some_metric","p":[{"c":"some_context","d":{"foo":"bar"},"v":10.0}]}]}"#
    );

    client
        .aggregate(
            "some_metric",
            234.5,
            Some("some_context"),
            Some(dimensions(&[("foo", "bar")])),
        )
        .expect("aggregate failed");
    client.flush().await.expect("flush failed");
    assert_eq!(
        recv_datagram(&socket).await,
        r#"{"a":"some_key","d":"app4you2lovestaging","o":"t","w":[{"n":"some_metric","p":[{"c":"some_context","d":{"foo":"bar"},"v":234.5}]}]}"#
    );

    client.close().await;
}

#[tokio::test]
async fn mixed_udp_operations_in_one_flush_stay_separate_datagrams() {
    let (socket, addr) = udp_recorder().await;
    let config = Config::new("app4you2love", "staging", "some_key").with_aggregator_addr(&addr);
    let client = Errplane::new(config).expect("client creation failed");

    client
        .report_udp("some_metric", 1.0, None, None)
        .expect("report_udp failed");
    client.sum("some_metric", 2, None, None).expect("sum failed");
    client
        .aggregate("some_metric", 3.0, None, None)
        .expect("aggregate failed");
    client.flush().await.expect("flush failed");

    // Dispatch order within a flush: report, aggregate, sum.
    assert!(recv_datagram(&socket).await.contains(r#""o":"r""#));
    assert!(recv_datagram(&socket).await.contains(r#""o":"t""#));
    assert!(recv_datagram(&socket).await.contains(r#""o":"c""#));

    client.close().await;
}

#[tokio::test]
async fn transport_failure_does_not_stop_subsequent_flushes() {
    let mut server = Server::new_async().await;

    let failing_mock = server
        .mock("POST", "/databases/app4you2lovestaging/points")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(2)
        .create_async()
        .await;

    let client = Errplane::new(http_config(&server)).expect("client creation failed");

    client
        .report("some_metric", 1.0, SystemTime::now(), None, None)
        .expect("report failed");
    client.flush().await.expect("flush failed");

    // The first 500 was logged and dropped; the next flush still reaches
    // the collector.
    client
        .report("some_metric", 2.0, SystemTime::now(), None, None)
        .expect("report failed");
    client.flush().await.expect("flush failed");

    failing_mock.assert_async().await;

    client.close().await;
}

#[tokio::test]
async fn close_flushes_all_pending_points_in_one_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/databases/app4you2lovestaging/points")
        .match_query(Matcher::Any)
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let client = Errplane::new(http_config(&server)).expect("client creation failed");
    for i in 0..5 {
        client
            .report("some_metric", f64::from(i), SystemTime::now(), None, None)
            .expect("report failed");
    }
    client.close().await;

    mock.assert_async().await;

    assert!(client
        .report("some_metric", 1.0, SystemTime::now(), None, None)
        .is_err());
}

#[tokio::test]
async fn heartbeat_reports_until_close() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/databases/app4you2lovestaging/points")
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex(r#""n":"heartbeat""#.to_string()))
        .with_status(201)
        .expect_at_least(1)
        .create_async()
        .await;

    let client = Errplane::new(http_config(&server)).expect("client creation failed");
    client
        .heartbeat("heartbeat", Duration::from_millis(50), None, None)
        .expect("heartbeat failed");

    tokio::time::sleep(Duration::from_millis(200)).await;
    client.flush().await.expect("flush failed");
    client.close().await;

    mock.assert_async().await;
}
