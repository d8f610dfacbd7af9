use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated gateway endpoints. Login failures return one generic 401
/// regardless of whether the username exists.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; touches nothing.
        .route("/health", get(|| async { "ok" }))
        // POST /api/register
        // Self-registration. Always creates a `user`-role account.
        .route("/api/register", post(handlers::register))
        // POST /api/login
        // Credentials in, `{token, role}` out.
        .route("/api/login", post(handlers::login))
}
