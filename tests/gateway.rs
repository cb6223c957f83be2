//! End-to-end tests: client → gateway → mock backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::config::{ClientKeySource, GatewayConfig, RouteConfig};
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

mod common;

use common::Recorded;

fn config_with(routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routes = routes;
    config
}

#[tokio::test]
async fn test_forwards_with_rewritten_target_and_headers() {
    let backend = common::start_backend(|_: Recorded| async {
        Response::builder()
            .status(StatusCode::CREATED)
            .header("x-multi", "first")
            .header("x-multi", "second")
            .header("x-backend", "svc")
            .body(Body::from("created"))
            .unwrap()
    })
    .await;

    let config = config_with(vec![RouteConfig::new("/api/", backend.url("/svc?b=2"))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/api/svc/items?a=1"))
        .header("x-custom", "kept")
        .header("x-forwarded-for", "6.6.6.6")
        .send()
        .await
        .expect("Gateway unreachable");

    assert_eq!(res.status(), 201);
    let multi: Vec<_> = res
        .headers()
        .get_all("x-multi")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(multi, vec!["first", "second"]);
    assert_eq!(res.headers()["x-backend"], "svc");
    let response_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(res.text().await.unwrap(), "created");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let seen = &requests[0];
    assert_eq!(seen.path_and_query, "/svc/items?a=1&b=2");
    assert_eq!(seen.headers["x-custom"], "kept");
    assert_eq!(seen.headers["x-forwarded-for"], "127.0.0.1");
    assert_eq!(seen.headers["x-forwarded-host"], gateway.to_string().as_str());
    assert_eq!(seen.headers["x-forwarded-proto"], "http");
    assert_eq!(seen.headers["host"], backend.addr.to_string().as_str());
    assert_eq!(seen.headers["x-request-id"], response_id.as_str());

    shutdown.trigger();
}

#[tokio::test]
async fn test_longest_prefix_selects_backend() {
    let general = common::start_echo_backend().await;
    let users = common::start_echo_backend().await;

    let config = config_with(vec![
        RouteConfig::new("/api/", general.url("/")),
        RouteConfig::new("/api/users/", users.url("/users/")),
    ]);
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(format!("http://{gateway}/api/users/42")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client.get(format!("http://{gateway}/api/orders/7")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let user_requests = users.requests();
    assert_eq!(user_requests.len(), 1);
    assert_eq!(user_requests[0].path_and_query, "/users/42");

    let general_requests = general.requests();
    assert_eq!(general_requests.len(), 1);
    assert_eq!(general_requests[0].path_and_query, "/api/orders/7");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_path_returns_404_without_backend_call() {
    let backend = common::start_echo_backend().await;
    let config = config_with(vec![RouteConfig::new("/auth/", backend.url("/auth/"))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/users/1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "service not found");
    assert_eq!(backend.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limited_requests_never_reach_backend() {
    let backend = common::start_echo_backend().await;
    let mut config = config_with(vec![RouteConfig::new("/", backend.url("/"))]);
    config.rate_limit.limit = 2;
    config.rate_limit.window_ms = 60_000;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let res = client.get(format!("http://{gateway}/ping")).send().await.unwrap();
        let status = res.status().as_u16();
        if status == 429 {
            assert!(res.headers().contains_key("retry-after"));
            assert_eq!(res.text().await.unwrap(), "rate limit exceeded");
        }
        statuses.push(status);
    }

    assert_eq!(statuses, vec![200, 200, 429, 429]);
    assert_eq!(backend.hits(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_recovers_after_window() {
    let backend = common::start_echo_backend().await;
    let mut config = config_with(vec![RouteConfig::new("/", backend.url("/"))]);
    config.rate_limit.limit = 1;
    config.rate_limit.window_ms = 300;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();
    let url = format!("http://{gateway}/");

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    assert_eq!(client.get(&url).send().await.unwrap().status(), 429);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);

    shutdown.trigger();
}

#[tokio::test]
async fn test_header_client_keys_are_limited_independently() {
    let backend = common::start_echo_backend().await;
    let mut config = config_with(vec![RouteConfig::new("/", backend.url("/"))]);
    config.rate_limit.limit = 1;
    config.rate_limit.client_key = ClientKeySource::Header("x-api-key".into());
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();
    let url = format!("http://{gateway}/");

    let send = |key: &'static str| client.get(&url).header("x-api-key", key).send();
    assert_eq!(send("alpha").await.unwrap().status(), 200);
    assert_eq!(send("beta").await.unwrap().status(), 200);
    assert_eq!(send("alpha").await.unwrap().status(), 429);
    assert_eq!(backend.hits(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_admit_exactly_limit() {
    let backend = common::start_echo_backend().await;
    let mut config = config_with(vec![RouteConfig::new("/", backend.url("/"))]);
    config.rate_limit.limit = 5;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let url = format!("http://{gateway}/burst");
        tasks.push(tokio::spawn(async move {
            client.get(url).send().await.unwrap().status().as_u16()
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for task in tasks {
        match task.await.unwrap() {
            200 => ok += 1,
            429 => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(limited, 15);
    assert_eq!(backend.hits(), 5);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_backend_returns_502() {
    let dead = common::closed_addr().await;
    let config = config_with(vec![RouteConfig::new("/", format!("http://{dead}/"))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/anything"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    assert!(res.text().await.unwrap().starts_with("failed to execute request"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_backend_returns_504() {
    let backend = common::start_backend(|_: Recorded| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Response::new(Body::from("too late"))
    })
    .await;
    let mut config = config_with(vec![RouteConfig::new("/", backend.url("/"))]);
    config.timeouts.request_secs = 1;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/slow"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
    assert_eq!(backend.hits(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_body_round_trip_is_byte_identical() {
    let backend = common::start_echo_backend().await;
    let config = config_with(vec![RouteConfig::new("/upload/", backend.url("/"))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let payload: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let res = common::client()
        .post(format!("http://{gateway}/upload/blob"))
        .body(payload.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.bytes().await.unwrap().as_ref(), payload.as_slice());

    let requests = backend.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path_and_query, "/upload/blob");
    assert_eq!(requests[0].body.as_ref(), payload.as_slice());

    shutdown.trigger();
}

/// Counts handler futures dropped before they finished.
struct CompletionGuard {
    cancelled: Arc<AtomicUsize>,
    finished: bool,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn test_client_disconnect_cancels_backend_call() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let counter = cancelled.clone();
    let backend = common::start_backend(move |_: Recorded| {
        let cancelled = counter.clone();
        async move {
            let mut guard = CompletionGuard {
                cancelled,
                finished: false,
            };
            tokio::time::sleep(Duration::from_secs(3)).await;
            guard.finished = true;
            Response::new(Body::from("finished"))
        }
    })
    .await;
    let config = config_with(vec![RouteConfig::new("/", backend.url("/"))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let impatient = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let result = impatient.get(format!("http://{gateway}/slow")).send().await;
    assert!(result.is_err());

    // Well before the backend's 3s sleep would have finished.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(backend.hits(), 1);
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_https_backend_is_dialed_over_tls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = listener.local_addr().unwrap();
    let first_bytes = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 3];
        socket.read_exact(&mut buf).await.unwrap();
        buf
    });

    let config = config_with(vec![RouteConfig::new("/secure/", format!("https://{backend}/"))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/secure/data"))
        .send()
        .await
        .unwrap();

    // A TLS handshake record (0x16, version 3.x) rather than an HTTP request line.
    let bytes = first_bytes.await.unwrap();
    assert_eq!(bytes[0], 0x16);
    assert_eq!(bytes[1], 0x03);
    // The listener hung up mid-handshake.
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}
