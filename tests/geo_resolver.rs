//! IpInfoResolver against an in-process stand-in for ipinfo.io

use axum::{Router, extract::Path, http::StatusCode, routing::get};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use wellness_gateway::geo::{CountryResolver, FALLBACK_IP, IpInfoResolver};

async fn spawn_stub(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn ipinfo_stub(seen: Arc<Mutex<Vec<String>>>) -> Router {
    Router::new().route(
        "/:ip/country",
        get(move |Path(ip): Path<String>| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(ip.clone());
                match ip.as_str() {
                    "103.21.244.1" => (StatusCode::OK, "IN\n".to_string()),
                    "41.90.1.2" => (StatusCode::OK, "ke".to_string()),
                    "8.8.4.4" => (StatusCode::OK, "ZZ".to_string()),
                    _ => (StatusCode::TOO_MANY_REQUESTS, "rate limited".to_string()),
                }
            }
        }),
    )
}

#[tokio::test]
async fn test_loopback_resolves_through_fallback_address() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_stub(ipinfo_stub(seen.clone())).await;
    let resolver = IpInfoResolver::new(&format!("http://{addr}"), FALLBACK_IP, 2_000).unwrap();

    assert_eq!(resolver.resolve_country("127.0.0.1").await.as_deref(), Some("India"));
    assert_eq!(resolver.resolve_country("").await.as_deref(), Some("India"));
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &["103.21.244.1".to_string(), "103.21.244.1".to_string()]
    );
}

#[tokio::test]
async fn test_public_address_maps_code_to_name() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_stub(ipinfo_stub(seen)).await;
    let resolver = IpInfoResolver::new(&format!("http://{addr}"), FALLBACK_IP, 2_000).unwrap();

    assert_eq!(resolver.resolve_country("41.90.1.2").await.as_deref(), Some("Kenya"));
}

#[tokio::test]
async fn test_unknown_code_and_error_status_are_unknown() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_stub(ipinfo_stub(seen)).await;
    let resolver = IpInfoResolver::new(&format!("http://{addr}"), FALLBACK_IP, 2_000).unwrap();

    assert_eq!(resolver.resolve_country("8.8.4.4").await, None);
    assert_eq!(resolver.resolve_country("1.2.3.4").await, None);
}

#[tokio::test]
async fn test_unreachable_service_is_unknown() {
    // bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let resolver = IpInfoResolver::new(&format!("http://{addr}"), FALLBACK_IP, 500).unwrap();
    assert_eq!(resolver.resolve_country("41.90.1.2").await, None);
}

#[tokio::test]
async fn test_non_ip_identifier_never_reaches_service() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_stub(ipinfo_stub(seen.clone())).await;
    let resolver = IpInfoResolver::new(&format!("http://{addr}"), FALLBACK_IP, 2_000).unwrap();

    assert_eq!(resolver.resolve_country("103.21.244.1/../x?y#z").await, None);
    assert_eq!(resolver.resolve_country("example.com").await, None);
    assert!(seen.lock().unwrap().is_empty());
}
