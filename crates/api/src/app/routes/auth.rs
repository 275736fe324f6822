use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use bizadmin_auth::Operation;

use crate::app::dto::{LoginRequest, LoginResponse, MessageResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize_operation;
use crate::context::PrincipalContext;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    if let Err(err) = body.validate() {
        return errors::domain_error_to_response(err);
    }

    let outcome = match services.auth.login(&body.email, &body.password).await {
        Ok(outcome) => outcome,
        Err(err) => return errors::domain_error_to_response(err),
    };

    let mut response = (
        StatusCode::OK,
        Json(LoginResponse {
            message: "login successful",
            user: outcome.user,
        }),
    )
        .into_response();
    if let Some(cookie) = services.session_cookie.issue(&outcome.token) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let mut response = (
        StatusCode::OK,
        Json(MessageResponse {
            message: "logout successful",
        }),
    )
        .into_response();
    if let Some(cookie) = services.session_cookie.clear() {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

pub async fn verify_session(Extension(principal): Extension<PrincipalContext>) -> Response {
    if let Err(err) = authorize_operation(&principal, Operation::VerifySession) {
        return errors::domain_error_to_response(err);
    }
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "session verified",
        }),
    )
        .into_response()
}
