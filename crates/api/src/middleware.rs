use axum::{extract::State, middleware::Next, response::Response};
use axum::http::StatusCode;

use bizadmin_infra::services::AuthService;

use crate::app::errors;
use crate::context::PrincipalContext;
use crate::session::extract_token;

#[derive(Clone)]
pub struct AuthState {
    pub auth: AuthService,
}

/// Resolve the session token into a [`PrincipalContext`], or answer 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(req.headers()) else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication required",
        );
    };

    match state.auth.authenticate(&token).await {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::new(principal));
            next.run(req).await
        }
        Err(err) => errors::domain_error_to_response(err),
    }
}
