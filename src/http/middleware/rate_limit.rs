use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::domain::payment::{ErrorEnvelope, ErrorPayload};

#[derive(Clone)]
pub struct RateLimitState {
    pub redis_client: redis::Client,
    pub max_per_minute: u64,
}

impl RateLimitState {
    /// Counts one hit in the caller's current window. `None` when Redis is
    /// unreachable, in which case the request is let through.
    async fn hit(&self, key: &str) -> Option<u64> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await.ok()?;
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, 120)
            .ignore()
            .query_async(&mut conn)
            .await
            .ok()?;
        Some(count)
    }
}

pub async fn enforce(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = window_key(&client_ip(&request), chrono::Utc::now());

    match state.hit(&key).await {
        Some(count) if count > state.max_per_minute => {
            tracing::warn!(key = %key, count, "rate limit exceeded");
            let body = ErrorEnvelope {
                error: ErrorPayload {
                    code: "RATE_LIMITED".to_string(),
                    message: "rate limit exceeded".to_string(),
                    details: None,
                },
            };
            (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response()
        }
        _ => next.run(request).await,
    }
}

fn client_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub fn window_key(ip: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    format!("ticketing:rate:{}:{}", ip, now.format("%Y%m%d%H%M"))
}
