//! Tests for streaming delta consumption

mod common;

use bytes::Bytes;
use common::{basic_auth, client_for, delta_line, ACCESS_TOKEN};
use futures::stream;
use nylas::error::{NylasError, Result};
use nylas::{consume_delta_stream, Delta};
use proptest::prelude::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_stream_deltas_in_order() {
    let body = format!(
        "{}\n\n{}\n \n{}\n",
        delta_line("d1", "c1"),
        delta_line("d2", "c2"),
        delta_line("d3", "c3"),
    );

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .and(query_param("cursor", "start"))
        .and(header("authorization", basic_auth(ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let token = CancellationToken::new();
    let mut seen = Vec::new();
    let err = client
        .stream_deltas("start", &token, |d| seen.push((d.id, d.cursor)))
        .await
        .unwrap_err();

    // the server hanging up is reported, not treated as success
    assert!(err.is_transport_error());

    assert_eq!(
        seen,
        vec![
            ("d1".to_string(), "c1".to_string()),
            ("d2".to_string(), "c2".to_string()),
            ("d3".to_string(), "c3".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_stream_truncated_record_is_reported() {
    let body = format!("{}\n{{\"id\":\"d2\",\"cursor\":\"c2\"", delta_line("d1", "c1"));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let mut last_cursor = None;
    let err = client_for(&server)
        .stream_deltas("start", &token, |d| last_cursor = Some(d.cursor))
        .await
        .unwrap_err();

    assert_eq!(last_cursor.as_deref(), Some("c1"));
    match err {
        NylasError::MalformedDelta { line, .. } => {
            assert_eq!(line, "{\"id\":\"d2\",\"cursor\":\"c2\"")
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_malformed_line_stops_delivery() {
    let body = format!(
        "{}\nnot a delta\n{}\n",
        delta_line("d1", "c1"),
        delta_line("d2", "c2"),
    );

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let mut seen = Vec::new();
    let err = client_for(&server)
        .stream_deltas("start", &token, |d| seen.push(d.id))
        .await
        .unwrap_err();

    assert_eq!(seen, vec!["d1"]);
    match err {
        NylasError::MalformedDelta { line, .. } => assert_eq!(line, "not a delta"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .respond_with(ResponseTemplate::new(403).set_body_string("account disabled"))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let mut called = false;
    let err = client_for(&server)
        .stream_deltas("start", &token, |_| called = true)
        .await
        .unwrap_err();

    assert!(!called);
    match err {
        NylasError::Api(api) => {
            assert_eq!(api.status_code, 403);
            assert!(api.is_unknown_format());
            assert_eq!(api.message, "account disabled");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_cancelled_before_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let result = client_for(&server)
        .stream_deltas("start", &token, |_| {})
        .await;
    assert!(matches!(result, Err(NylasError::Cancelled)));
}

#[tokio::test]
async fn test_stream_cancel_while_waiting_for_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(delta_line("d1", "c1"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(3),
        client.stream_deltas("start", &token, |_| {}),
    )
    .await
    .expect("cancellation should end the call promptly");
    assert!(matches!(result, Err(NylasError::Cancelled)));
}

#[tokio::test]
async fn test_stream_missing_access_token() {
    let server = MockServer::start().await;
    let client = common::app_client_for(&server);
    let token = CancellationToken::new();
    let result = client.stream_deltas("start", &token, |_| {}).await;
    assert!(matches!(result, Err(NylasError::AccessTokenNotSet)));
}

fn split_frames(data: &[u8], chunk: usize) -> Vec<Result<Bytes>> {
    data.chunks(chunk)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

proptest! {
    #[test]
    fn prop_stream_delivers_all_lines(n in 0usize..20, chunk in 1usize..64) {
        let body: String = (0..n)
            .map(|i| format!("{}\n", delta_line(&format!("d{}", i), &format!("c{}", i))))
            .collect();

        let token = CancellationToken::new();
        let mut seen = Vec::new();
        let result = tokio_test::block_on(consume_delta_stream(
            stream::iter(split_frames(body.as_bytes(), chunk)),
            &token,
            |d: Delta| seen.push(d.id),
        ));

        let closed = matches!(result, Err(NylasError::NetworkError(_)));
        prop_assert!(closed);
        let expected: Vec<String> = (0..n).map(|i| format!("d{}", i)).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_stream_stops_at_malformed_line(
        n in 1usize..20,
        bad in 0usize..20,
        chunk in 1usize..64,
    ) {
        let bad = bad % n;
        let body: String = (0..n)
            .map(|i| {
                if i == bad {
                    "{\"id\": broken\n".to_string()
                } else {
                    format!("{}\n", delta_line(&format!("d{}", i), &format!("c{}", i)))
                }
            })
            .collect();

        let token = CancellationToken::new();
        let mut seen = Vec::new();
        let result = tokio_test::block_on(consume_delta_stream(
            stream::iter(split_frames(body.as_bytes(), chunk)),
            &token,
            |d: Delta| seen.push(d.id),
        ));

        let is_malformed = matches!(result, Err(NylasError::MalformedDelta { .. }));
        prop_assert!(is_malformed);
        let expected: Vec<String> = (0..bad).map(|i| format!("d{}", i)).collect();
        prop_assert_eq!(seen, expected);
    }
}
