use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod merchants;
pub mod system;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/verify-session", get(auth::verify_session))
        .nest("/merchants", merchants::router())
}
