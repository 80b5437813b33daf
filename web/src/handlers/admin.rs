use crate::registry::SessionRegistry;
use serde::Serialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub sessions_created: u64,
    pub active_sessions: usize,
}

/// Read-only operational counters.
pub async fn stats(registry: Arc<SessionRegistry>) -> Response {
    success_response(
        StatusCode::OK,
        StatsResponse {
            sessions_created: registry.created_total(),
            active_sessions: registry.active_count(),
        },
    )
}

pub async fn list_sessions(registry: Arc<SessionRegistry>) -> Response {
    success_response(StatusCode::OK, registry.snapshots())
}

pub async fn get_session(registry: Arc<SessionRegistry>, token: String) -> Response {
    match registry.get(&token) {
        Some(session) => success_response(StatusCode::OK, session.snapshot()),
        None => error_response(
            StatusCode::NOT_FOUND,
            "session_not_found",
            format!("session not found: {}", token),
        ),
    }
}

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn error_response(status: StatusCode, error: &'static str, message: String) -> Response {
    #[derive(Serialize)]
    struct ErrorBody<'a> {
        error: &'a str,
        message: String,
    }

    let body = ErrorBody { error, message };
    reply::with_status(reply::json(&body), status).into_response()
}
