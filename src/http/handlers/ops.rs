use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct Readiness {
    ready: bool,
    db: bool,
    redis: bool,
    providers: Vec<&'static str>,
}

async fn database_ok(state: &AppState) -> bool {
    let Some(pool) = &state.pool else {
        return true;
    };
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

async fn redis_ok(state: &AppState) -> bool {
    let Some(client) = &state.redis_client else {
        return true;
    };
    let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
        return false;
    };
    let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    pong.is_ok()
}

/// Backends that are not configured (in-memory runs) count as ready.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let db = database_ok(&state).await;
    let redis = redis_ok(&state).await;
    let providers = state.bookings.providers.methods();
    let ready = db && redis && !providers.is_empty();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(Readiness { ready, db, redis, providers }))
}

pub async fn liveness() -> impl IntoResponse {
    Json(serde_json::json!({"alive": true}))
}
