//! End-to-end escalation against local backends over real HTTP.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::json;

use resilient_fetch::client::{Method, ParsedBody, RequestError, RequestOptions};
use resilient_fetch::config::{ClientConfig, TimeoutConfig};
use resilient_fetch::RequestClient;

mod common;
use common::{MockRequest, MockResponse};

const ORIGIN: &str = "https://app.test";
const CLOSED_RELAY: &str = "http://127.0.0.1:9/";

fn config(api: SocketAddr, relays: Vec<String>) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.production_root = format!("http://{}", api);
    config.relays.endpoints = relays;
    config.cors.origin = Some(ORIGIN.into());
    config.timeouts = TimeoutConfig {
        request_secs: 2,
        bridge_secs: 2,
        script_secs: 2,
    };
    config
}

/// Denies cross-origin callers, answers the origin-less bridge with 503
/// and serves callback scripts.
async fn script_only_backend(script_loads: Arc<AtomicU32>) -> SocketAddr {
    common::start_programmable_backend(move |req: MockRequest| {
        let script_loads = script_loads.clone();
        async move {
            if let Some(name) = req.query_param("callback") {
                script_loads.fetch_add(1, Ordering::SeqCst);
                let script = format!(r#"{}({{"via":"script"}});"#, name);
                return MockResponse::new(200, script).header("Content-Type", "application/javascript");
            }
            if req.header("Origin").is_some() {
                return MockResponse::json(200, r#"{"via":"direct"}"#);
            }
            MockResponse::new(503, "unavailable")
        }
    })
    .await
}

#[tokio::test]
async fn test_direct_success_with_cors() {
    let api = common::start_mock_backend(r#"{"items":[1,2]}"#).await;
    let client = RequestClient::from_config(&config(api, vec![CLOSED_RELAY.into()])).unwrap();

    let body = client.get("/items").await.unwrap();

    assert_eq!(body, ParsedBody::Json(json!({ "items": [1, 2] })));
    assert_eq!(client.snapshot().cross_origin_failures, 0);
}

#[tokio::test]
async fn test_no_content_is_success() {
    let api = common::start_programmable_backend(|_| async { MockResponse::new(204, "").cors() }).await;
    let client = RequestClient::from_config(&config(api, vec![CLOSED_RELAY.into()])).unwrap();

    let body = client.delete("/items/3").await.unwrap();
    assert_eq!(body.into_value(), json!({ "success": true }));
}

#[tokio::test]
async fn test_cors_denied_falls_back_to_relay() {
    let api = common::start_programmable_backend(|_| async { MockResponse::json(200, r#"{"via":"direct"}"#) }).await;
    let relay = common::start_programmable_backend(|req: MockRequest| async move {
        let relayed = req.path.starts_with("/http://") && req.header("X-Requested-With") == Some("XMLHttpRequest");
        if relayed {
            MockResponse::json(200, r#"{"via":"relay"}"#).cors()
        } else {
            MockResponse::new(404, "not relayed").cors()
        }
    })
    .await;
    let relay_root = format!("http://{}/", relay);
    let client = RequestClient::from_config(&config(api, vec![relay_root.clone()])).unwrap();

    let body = client.get("/items").await.unwrap();

    assert_eq!(body, ParsedBody::Json(json!({ "via": "relay" })));
    let snapshot = client.snapshot();
    assert_eq!(snapshot.cross_origin_failures, 1);
    assert_eq!(snapshot.relay_root, relay_root);
    assert!(!snapshot.use_relay);
}

#[tokio::test]
async fn test_http_error_with_catch_error() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let api = common::start_programmable_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { MockResponse::new(500, "boom").cors() }
    })
    .await;
    let client = RequestClient::from_config(&config(api, vec![CLOSED_RELAY.into()])).unwrap();

    let body = client
        .request("/items", RequestOptions::get().catch_error(true))
        .await
        .unwrap();

    assert_eq!(body.into_value(), json!({ "error": true, "message": "HTTP 500: boom" }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(client.snapshot().cross_origin_failures, 0);
}

#[tokio::test]
async fn test_bridge_after_relay_unreachable() {
    let api = common::start_programmable_backend(|req: MockRequest| async move {
        if req.header("Origin").is_some() {
            MockResponse::json(200, r#"{"via":"direct"}"#)
        } else {
            MockResponse::json(200, r#"{"via":"bridge"}"#)
        }
    })
    .await;
    let client = RequestClient::from_config(&config(api, vec![CLOSED_RELAY.into()])).unwrap();

    let body = client.get("/items").await.unwrap();

    assert_eq!(body, ParsedBody::Json(json!({ "via": "bridge" })));
    assert_eq!(client.snapshot().cross_origin_failures, 1);
    assert_eq!(client.bridge().pending_count(), 0);
    assert_eq!(client.bridge().host().live_contexts(), 0);
}

#[tokio::test]
async fn test_script_callback_last_resort() {
    let script_loads = Arc::new(AtomicU32::new(0));
    let api = script_only_backend(script_loads.clone()).await;
    let client = RequestClient::from_config(&config(api, vec![CLOSED_RELAY.into()])).unwrap();

    let body = client.get("/items?page=2").await.unwrap();

    assert_eq!(body, ParsedBody::Json(json!({ "via": "script" })));
    assert_eq!(script_loads.load(Ordering::SeqCst), 1);
    assert!(client.script().callbacks().is_empty());
    assert_eq!(client.script().loader().injected_count(), 0);
}

#[tokio::test]
async fn test_post_never_reaches_script_callback() {
    let script_loads = Arc::new(AtomicU32::new(0));
    let api = script_only_backend(script_loads.clone()).await;
    let client = RequestClient::from_config(&config(api, vec![CLOSED_RELAY.into()])).unwrap();

    let err = client
        .request("/items", RequestOptions::new(Method::Post).body(r#"{"name":"x"}"#))
        .await
        .unwrap_err();

    assert!(matches!(err, RequestError::BridgeRemote(_)));
    assert_eq!(script_loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_relay_mode_after_repeated_denials() {
    let api = common::start_programmable_backend(|req: MockRequest| async move {
        if req.header("Origin").is_some() {
            MockResponse::json(200, r#"{"via":"direct"}"#)
        } else {
            MockResponse::json(200, r#"{"via":"bridge"}"#)
        }
    })
    .await;
    let mut config = config(api, vec![CLOSED_RELAY.into()]);
    config.escalation.max_retries = 2;
    let client = RequestClient::from_config(&config).unwrap();

    for _ in 0..3 {
        let body = client.get("/items").await.unwrap();
        assert_eq!(body.into_value(), json!({ "via": "bridge" }));
    }

    let snapshot = client.snapshot();
    assert!(snapshot.use_relay);
    assert_eq!(snapshot.cross_origin_failures, 3);
    assert!(client.state().threshold_exceeded());
}
