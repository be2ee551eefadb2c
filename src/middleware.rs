use std::net::IpAddr;

use actix_web::http::{Method, header};
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    middleware::Next,
    web,
};

use actix_web::ResponseError;

use crate::config::Config;
use crate::errors::{AppError, rate_limited_response};
use crate::rate_limit::{RateLimits, retry_after_secs};

/// Baseline security headers on every response; HSTS only over TLS.
pub async fn security_headers(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let is_tls = req.connection_info().scheme() == "https";

    let mut res = next.call(req).await?;
    let headers = res.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );
    if is_tls {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    Ok(res)
}

/// CORS gate: reflect a specifically allowed origin (or the wildcard when so
/// configured), answer preflights with 204, and reject preflights from
/// disallowed origins with 403.
pub async fn cors(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let config = req
        .app_data::<web::Data<Config>>()
        .expect("Config must be registered as app data")
        .clone();
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let origin_allowed = !origin.is_empty() && config.allowed_origins.allows(&origin);

    let mut cors_headers: Vec<(HeaderName, HeaderValue)> = Vec::new();
    if origin_allowed {
        if config.allowed_origins.is_any() {
            cors_headers.push((
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ));
        } else if let Ok(value) = HeaderValue::from_str(&origin) {
            cors_headers.push((header::ACCESS_CONTROL_ALLOW_ORIGIN, value));
            cors_headers.push((header::VARY, HeaderValue::from_static("Origin")));
        }
        cors_headers.push((
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ));
        cors_headers.push((
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, X-API-Key"),
        ));
        cors_headers.push((
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("300"),
        ));
    }

    if req.method() == Method::OPTIONS {
        let response = if !origin.is_empty() && !origin_allowed {
            HttpResponse::Forbidden().json(serde_json::json!({ "error": "origin not allowed" }))
        } else {
            let mut builder = HttpResponse::NoContent();
            for (name, value) in &cors_headers {
                builder.insert_header((name.clone(), value.clone()));
            }
            builder.finish()
        };
        return Ok(req.into_response(response).map_into_right_body());
    }

    let mut res = next.call(req).await?;
    for (name, value) in cors_headers {
        if name == header::VARY {
            res.headers_mut().append(name, value);
        } else {
            res.headers_mut().insert(name, value);
        }
    }
    Ok(res.map_into_left_body())
}

/// Fixed-window limit per client IP. Preflights are exempt; they are already
/// short-circuited by the CORS gate.
pub async fn ip_rate_limit(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if req.method() == Method::OPTIONS {
        return next.call(req).await.map(|res| res.map_into_left_body());
    }

    let config = req
        .app_data::<web::Data<Config>>()
        .expect("Config must be registered as app data")
        .clone();
    let limits = req
        .app_data::<web::Data<RateLimits>>()
        .expect("RateLimits must be registered as app data")
        .clone();

    let ip = client_ip(&req, config.trust_proxy_headers);
    if let Err(retry) = limits.ip.check(&format!("ip:{ip}")) {
        let response = rate_limited_response(retry_after_secs(retry));
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// API-key gate for write routes. With no keys configured, writes are open.
pub async fn require_write_api_key(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let config = req
        .app_data::<web::Data<Config>>()
        .expect("Config must be registered as app data")
        .clone();

    if config.write_api_keys.is_empty() {
        return next.call(req).await.map(|res| res.map_into_left_body());
    }

    let api_key = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");

    let rejection = if api_key.is_empty() {
        Some("missing API key")
    } else if !config.write_api_keys.contains(api_key) {
        Some("invalid API key")
    } else {
        None
    };

    if let Some(message) = rejection {
        let response = AppError::Auth(message).error_response();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

fn client_ip(req: &ServiceRequest, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
        {
            if let Some(ip) = forwarded.split(',').next().and_then(parse_ip_candidate) {
                return ip;
            }
        }
        if let Some(real_ip) = req.headers().get("x-real-ip").and_then(|v| v.to_str().ok()) {
            if let Some(ip) = parse_ip_candidate(real_ip) {
                return ip;
            }
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn parse_ip_candidate(raw: &str) -> Option<String> {
    raw.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}
