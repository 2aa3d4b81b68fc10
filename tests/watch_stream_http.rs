/// Stream reader behavior over real HTTP connections: framing across
/// chunks, status handling, redirects, and finish-while-blocked.
///
/// Each test runs a one-shot server on a local TCP listener serving a
/// canned HTTP/1.1 response with a close-delimited body, which is how a
/// watch endpoint streams.
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use watchcache::{ApiClient, ClientConfig, Error, ListerWatcher, WatchEvent, WatchOptions};

const STREAM_HEADERS: &str = "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n";

async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];
    loop {
        let n = socket.read(&mut buffer).await.unwrap();
        data.extend_from_slice(&buffer[..n]);
        if n == 0 || data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// Serves exactly one connection with `body` streamed after the status
/// line, then closes. Returns the base URL and a receiver for the raw
/// request the server saw.
async fn serve_stream(body: Vec<&'static str>) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (request_tx, request_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let _ = request_tx.send(request);
        socket.write_all(STREAM_HEADERS.as_bytes()).await.unwrap();
        for piece in body {
            socket.write_all(piece.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            sleep(Duration::from_millis(5)).await;
        }
    });
    (format!("http://{addr}/api/v1"), request_rx)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(ClientConfig::new(base_url)).unwrap()
}

#[tokio::test]
async fn test_watch_events_parsed_across_network_chunks() {
    // second notice split mid-document across two writes
    let (base, request_rx) = serve_stream(vec![
        "{\"type\":\"ADDED\",\"object\":{\"metadata\":{\"uid\":\"id1\"}}}\n{\"type\":\"DEL",
        "ETED\",\"object\":{\"metadata\":{\"uid\":\"id1\"}}}\n",
    ])
    .await;

    let mut stream = client(&base).watch("pods", &WatchOptions::default()).await.unwrap();
    let first = stream.next_event().await.unwrap().unwrap();
    let second = stream.next_event().await.unwrap().unwrap();
    assert_eq!(first.kind(), "ADDED");
    assert_eq!(second.kind(), "DELETED");
    assert_eq!(stream.next_event().await.unwrap(), None);

    let request = request_rx.await.unwrap();
    assert!(request.starts_with("GET /api/v1/watch/pods "), "unexpected request: {request}");
}

#[tokio::test]
async fn test_empty_body_yields_zero_events() {
    let (base, _request_rx) = serve_stream(vec![]).await;
    let mut stream = client(&base).watch("pods", &WatchOptions::default()).await.unwrap();
    assert_eq!(stream.next_event().await.unwrap(), None);
}

#[tokio::test]
async fn test_non_2xx_fails_immediately_with_status_and_body() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        let body = "pods not here";
        let response = format!(
            "HTTP/1.1 404 Not Found\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    });

    let result = client(&format!("http://{addr}/api/v1"))
        .watch("pods", &WatchOptions::default())
        .await;
    match result {
        Err(Error::Protocol { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "pods not here");
        }
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let (target_base, target_request_rx) =
        serve_stream(vec!["{\"type\":\"ADDED\",\"object\":{\"metadata\":{\"uid\":\"id1\"}}}\n"])
            .await;
    let location = format!("{target_base}/watch/pods");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 302 Found\r\nLocation: {location}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    });

    let mut stream = client(&format!("http://{addr}/api/v1"))
        .watch("pods", &WatchOptions::default())
        .await
        .unwrap();
    let event = stream.next_event().await.unwrap().unwrap();
    assert_eq!(event.kind(), "ADDED");

    let request = target_request_rx.await.unwrap();
    assert!(request.starts_with("GET /api/v1/watch/pods "), "redirect target saw: {request}");
}

#[tokio::test]
async fn test_redirects_disabled_surface_the_redirect_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        let response = "HTTP/1.1 302 Found\r\nLocation: http://127.0.0.1:1/x\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
        socket.write_all(response.as_bytes()).await.unwrap();
    });

    let client =
        ApiClient::new(ClientConfig::new(format!("http://{addr}/api/v1")).max_redirects(0))
            .unwrap();
    let result = client.watch("pods", &WatchOptions::default()).await;
    assert_eq!(result.err().and_then(|e| e.status()), Some(302));
}

#[tokio::test]
async fn test_redirect_hop_limit_is_enforced() {
    // one hop pointing at itself; limit of 1 means the second hop fails
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let _ = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 302 Found\r\nLocation: http://{addr}/api/v1/watch/pods\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    let client =
        ApiClient::new(ClientConfig::new(format!("http://{addr}/api/v1")).max_redirects(1))
            .unwrap();
    let result = client.watch("pods", &WatchOptions::default()).await;
    assert!(matches!(result, Err(Error::Http(_))), "expected a transport error");
}

#[tokio::test]
async fn test_finish_unblocks_a_read_on_an_open_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        socket.write_all(STREAM_HEADERS.as_bytes()).await.unwrap();
        socket
            .write_all(b"{\"type\":\"ADDED\",\"object\":{\"metadata\":{\"uid\":\"id1\"}}}\n")
            .await
            .unwrap();
        socket.flush().await.unwrap();
        // hold the connection open with no further data
        sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    let mut stream = client(&format!("http://{addr}/api/v1"))
        .watch("pods", &WatchOptions::default())
        .await
        .unwrap();
    let event = stream.next_event().await.unwrap().unwrap();
    assert_eq!(event.kind(), "ADDED");

    let finisher = stream.finisher();
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        finisher.finish();
    });

    let next = timeout(Duration::from_secs(2), stream.next_event())
        .await
        .expect("finish did not unblock the read");
    assert_eq!(next.unwrap(), None);
}

#[tokio::test]
async fn test_list_over_http_with_bearer_token() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (request_tx, request_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let _ = request_tx.send(request);
        let body = r#"{"metadata":{"resourceVersion":"9"},"items":[{"metadata":{"name":"a","uid":"id1"}}]}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    });

    let client = ApiClient::new(
        ClientConfig::new(format!("http://{addr}/api/v1")).bearer_token("sekret"),
    )
    .unwrap();
    let options = WatchOptions::default().namespace("default").resource_version("0");
    let list = client.list("pods", &options).await.unwrap();
    assert_eq!(list.resource_version, "9");
    assert_eq!(list.items.len(), 1);

    let request = request_rx.await.unwrap();
    assert!(
        request.starts_with("GET /api/v1/namespaces/default/pods?resourceVersion=0 "),
        "unexpected request: {request}"
    );
    assert!(request.to_lowercase().contains("authorization: bearer sekret"));
}

#[tokio::test]
async fn test_follow_lines_yields_raw_text() {
    let (base, request_rx) = serve_stream(vec!["first log line\nsecond ", "log line\n"]).await;

    let client = client(&base);
    let mut lines = client
        .follow_lines("namespaces/default/pods/web/log", &[("follow", "true".to_string())])
        .await
        .unwrap();
    assert_eq!(lines.next_line().await.unwrap(), Some("first log line".to_string()));
    assert_eq!(lines.next_line().await.unwrap(), Some("second log line".to_string()));
    assert_eq!(lines.next_line().await.unwrap(), None);

    let request = request_rx.await.unwrap();
    assert!(
        request.starts_with("GET /api/v1/namespaces/default/pods/web/log?follow=true "),
        "unexpected request: {request}"
    );
}

/// The reader treats every event as data until the server closes; an ERROR
/// notice is policy for the reflector, not the stream.
#[tokio::test]
async fn test_error_notice_is_just_an_event_to_the_reader() {
    let (base, _request_rx) = serve_stream(vec!["{\"type\":\"ERROR\"}\n"]).await;
    let mut stream = client(&base).watch("pods", &WatchOptions::default()).await.unwrap();
    assert_eq!(stream.next_event().await.unwrap(), Some(WatchEvent::Error(None)));
    assert_eq!(stream.next_event().await.unwrap(), None);
}
