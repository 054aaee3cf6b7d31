mod helpers;

use helpers::setup_test_app;

#[tokio::test]
async fn test_rate_limit_headers_present() {
    let app = setup_test_app(&[("RATE_LIMIT_PER_WINDOW", "10")]);

    let response = app.client().get("/catalog").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("x-ratelimit-limit"), "10");
    assert_eq!(response.header("x-ratelimit-remaining"), "9");
}

#[tokio::test]
async fn test_requests_over_route_limit_get_429() {
    let app = setup_test_app(&[("RATE_LIMIT_ROUTES", "/catalog=3")]);
    let client = app.client();

    for expected_remaining in ["2", "1", "0"] {
        let response = client.get("/catalog").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("x-ratelimit-remaining"), expected_remaining);
    }

    let response = client.get("/catalog").await;
    assert_eq!(response.status_code(), 429);
    assert_eq!(response.header("x-ratelimit-limit"), "3");
    assert_eq!(response.header("x-ratelimit-remaining"), "0");

    let retry_after: u64 = response
        .header("retry-after")
        .to_str()
        .expect("ascii Retry-After")
        .parse()
        .expect("Retry-After in seconds");
    assert!((1..=60).contains(&retry_after), "retry_after = {retry_after}");

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "RATE_LIMITED");
    assert_eq!(body["recoverable"], true);
}

#[tokio::test]
async fn test_limits_are_per_route() {
    let app = setup_test_app(&[("RATE_LIMIT_ROUTES", "/catalog=1")]);
    let client = app.client();

    client.get("/catalog").await.assert_status_ok();
    assert_eq!(client.get("/catalog").await.status_code(), 429);

    // Other paths keep their own window.
    client.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_rejected_requests_keep_counting() {
    let app = setup_test_app(&[("RATE_LIMIT_ROUTES", "/catalog=2")]);
    let client = app.client();

    for _ in 0..5 {
        let _ = client.get("/catalog").await;
    }

    assert_eq!(app.state.rate_limiter.window_count(), 1);
    assert!(!app.state.rate_limiter.admit("/catalog").allowed);
}
