//! Integration tests for the request gatekeeper: security headers, CORS,
//! rate limiting, API-key gating, and the validation that runs before any
//! store access.

mod common;

use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::{App, test, web};

use ratemylifedecision::config::{AllowedOrigins, Config};
use ratemylifedecision::handlers;
use ratemylifedecision::middleware::{cors, ip_rate_limit, security_headers};

use common::{
    TEST_ORIGIN, TEST_VIEWER_ID, config_with_api_keys, lazy_pool, limits, open_limits, test_config,
};

macro_rules! test_app {
    ($config:expr, $limits:expr) => {
        test::init_service(
            App::new()
                .wrap(from_fn(ip_rate_limit))
                .wrap(from_fn(cors))
                .wrap(from_fn(security_headers))
                .app_data(web::Data::new($config))
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new($limits))
                .configure(handlers::configure),
        )
        .await
    };
}

async fn error_message<B>(resp: actix_web::dev::ServiceResponse<B>) -> String
where
    B: actix_web::body::MessageBody,
{
    let body: serde_json::Value = test::read_body_json(resp).await;
    body["error"].as_str().unwrap_or_default().to_string()
}

#[actix_web::test]
async fn health_returns_ok() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, serde_json::json!({ "ok": true }));
}

#[actix_web::test]
async fn security_headers_are_set_on_every_response() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    let headers = resp.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(
        headers.get("content-security-policy").unwrap(),
        "default-src 'none'; frame-ancestors 'none'; base-uri 'none'"
    );
    // Plain HTTP in tests: no HSTS.
    assert!(headers.get("strict-transport-security").is_none());
}

#[actix_web::test]
async fn preflight_from_allowed_origin_short_circuits_with_204() {
    let app = test_app!(test_config(), open_limits());

    let req = test::TestRequest::with_uri("/api/decisions")
        .method(actix_web::http::Method::OPTIONS)
        .insert_header(("Origin", TEST_ORIGIN))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let headers = resp.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        TEST_ORIGIN
    );
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type, X-API-Key"
    );
}

#[actix_web::test]
async fn preflight_from_disallowed_origin_is_forbidden() {
    let app = test_app!(test_config(), open_limits());

    let req = test::TestRequest::with_uri("/api/decisions")
        .method(actix_web::http::Method::OPTIONS)
        .insert_header(("Origin", "http://evil.example"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_message(resp).await, "origin not allowed");
}

#[actix_web::test]
async fn wildcard_configuration_reflects_star() {
    let config = Config {
        allowed_origins: AllowedOrigins::Any,
        ..test_config()
    };
    let app = test_app!(config, open_limits());

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Origin", "http://anywhere.example"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[actix_web::test]
async fn allowed_origin_is_reflected_with_vary_on_simple_requests() {
    let app = test_app!(test_config(), open_limits());

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Origin", TEST_ORIGIN))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        TEST_ORIGIN
    );
    assert_eq!(resp.headers().get("vary").unwrap(), "Origin");
}

#[actix_web::test]
async fn write_routes_require_an_api_key_when_configured() {
    let app = test_app!(config_with_api_keys(&["key-one", "key-two"]), open_limits());

    let payload = serde_json::json!({ "title": "Should I quit my job" });

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions")
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(resp).await, "missing API key");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions")
            .insert_header(("X-API-Key", "wrong"))
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(resp).await, "invalid API key");

    // A rotated key passes the gate; the short title then fails validation,
    // proving the request reached the handler.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions")
            .insert_header(("X-API-Key", "key-two"))
            .set_json(serde_json::json!({ "title": "abc" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(resp).await,
        "title must be between 4 and 100 characters"
    );
}

#[actix_web::test]
async fn reads_do_not_require_an_api_key() {
    let app = test_app!(config_with_api_keys(&["key-one"]), open_limits());

    // No key: the request passes the gate and fails on the invalid slug
    // instead of on auth.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/decisions/Bad_Slug")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "slug is invalid");
}

#[actix_web::test]
async fn unknown_json_fields_are_rejected() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions")
            .set_json(serde_json::json!({
                "title": "Should I quit my job",
                "bogus": 1,
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(resp).await.contains("bogus"));
}

#[actix_web::test]
async fn multi_value_bodies_are_rejected() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(r#"{"title":"Should I quit my job"}{"title":"again"}"#)
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(resp).await.starts_with("invalid JSON"));
}

#[actix_web::test]
async fn oversized_bodies_are_rejected_before_parsing() {
    let app = test_app!(test_config(), open_limits());

    // 3 KiB of payload against the 2 KiB vote ceiling; the contents never
    // get as far as JSON parsing.
    let oversized = format!(r#"{{"viewer_id":"{}","value":1,"pad":"{}"}}"#, TEST_VIEWER_ID, "x".repeat(3000));
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions/quit-my-job-ab1cd/vote")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(oversized)
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(resp).await,
        "request body must be 2048 bytes or fewer"
    );
}

#[actix_web::test]
async fn ip_rate_limit_rejects_with_retry_after() {
    let app = test_app!(test_config(), limits(2, 60));

    for _ in 0..2 {
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("Retry-After header");
    assert!(retry_after >= 1);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "rate limit exceeded");
    assert!(body["retry_after_seconds"].as_u64().unwrap() >= 1);
}

#[actix_web::test]
async fn viewer_rate_limit_applies_to_vote_requests() {
    let app = test_app!(test_config(), limits(120, 1));

    // The viewer limiter counts before the value check, so an invalid value
    // exercises it without touching the store.
    let payload = serde_json::json!({ "viewer_id": TEST_VIEWER_ID, "value": 0 });

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions/quit-my-job-ab1cd/vote")
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions/quit-my-job-ab1cd/vote")
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn forwarded_ip_is_honored_when_proxy_headers_are_trusted() {
    let config = Config {
        trust_proxy_headers: true,
        ..test_config()
    };
    let app = test_app!(config, limits(1, 60));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/health")
            .insert_header(("X-Forwarded-For", "10.0.0.1"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/health")
            .insert_header(("X-Forwarded-For", "10.0.0.1"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different forwarded IP lands in its own bucket.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/health")
            .insert_header(("X-Forwarded-For", "10.0.0.2"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn invalid_slug_is_rejected_before_the_store() {
    let app = test_app!(test_config(), open_limits());

    for bad in ["Bad_Slug", "-leading", "trailing-"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/decisions/{bad}"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(resp).await, "slug is invalid");
    }
}

#[actix_web::test]
async fn unknown_query_parameters_are_rejected() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/decisions/quit-my-job-ab1cd?foo=1")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/decisions/quit-my-job-ab1cd?viewer_id=not-a-uuid")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "viewer_id must be a valid UUID");
}

#[actix_web::test]
async fn vote_value_must_be_plus_or_minus_one() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions/quit-my-job-ab1cd/vote")
            .set_json(serde_json::json!({ "viewer_id": TEST_VIEWER_ID, "value": 2 }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "value must be -1 or 1");
}

#[actix_web::test]
async fn response_payload_enumerations_are_validated() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions/quit-my-job-ab1cd/responses")
            .set_json(serde_json::json!({
                "viewer_id": TEST_VIEWER_ID,
                "suggestion": 4,
                "emoji": "🫡",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(resp).await,
        "suggestion must be 1 (don't do it), 2 (mixed), or 3 (do it)"
    );

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions/quit-my-job-ab1cd/responses")
            .set_json(serde_json::json!({
                "viewer_id": TEST_VIEWER_ID,
                "suggestion": 3,
                "emoji": "💀",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "emoji is invalid");
}

#[actix_web::test]
async fn past_close_timestamps_are_rejected() {
    let app = test_app!(test_config(), open_limits());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions")
            .set_json(serde_json::json!({
                "title": "Should I quit my job",
                "closes_at": "2020-01-01T00:00:00Z",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "closes_at must be in the future");
}

#[actix_web::test]
async fn store_failures_surface_as_a_generic_500() {
    let app = test_app!(test_config(), open_limits());

    // Valid payload against the unreachable pool: the raw connection error
    // must not leak into the response body.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/decisions")
            .set_json(serde_json::json!({ "title": "Should I quit my job" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(resp).await, "internal server error");
}
