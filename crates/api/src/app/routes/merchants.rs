use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde::Serialize;

use bizadmin_auth::Operation;
use bizadmin_core::{DomainResult, MerchantId};
use bizadmin_merchants::{CreateMerchant, ExportFormat, UpdateMerchant};

use crate::app::dto::{ExportQuery, PageQuery, UpdateStatusRequest};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize_operation;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_merchants).post(create_merchant))
        .route("/departments-cities", get(departments))
        .route("/export", get(export_merchants))
        .route(
            "/:id",
            get(get_merchant).patch(update_merchant).delete(delete_merchant),
        )
        .route("/:id/totals", get(merchant_totals))
        .route("/:id/status", patch(update_status))
}

fn respond<T: Serialize>(status: StatusCode, result: DomainResult<T>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => errors::domain_error_to_response(err),
    }
}

/// Authorize the caller and, when given, parse the raw path id. Either
/// failure returns the error response from the enclosing handler.
macro_rules! guarded {
    ($principal:expr, $op:expr) => {
        if let Err(err) = authorize_operation(&$principal, $op) {
            return errors::domain_error_to_response(err);
        }
    };
    ($principal:expr, $op:expr, $raw_id:expr) => {{
        guarded!($principal, $op);
        match $raw_id.parse::<MerchantId>() {
            Ok(id) => id,
            Err(err) => return errors::domain_error_to_response(err),
        }
    }};
}

pub async fn departments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    guarded!(principal, Operation::ListDepartments);
    (StatusCode::OK, Json(services.merchants.departments())).into_response()
}

pub async fn list_merchants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    guarded!(principal, Operation::ListMerchants);
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::query_rejection(rejection),
    };
    respond(StatusCode::OK, services.merchants.list(query.page, query.limit).await)
}

pub async fn get_merchant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = guarded!(principal, Operation::GetMerchant, id);
    respond(StatusCode::OK, services.merchants.get(id).await)
}

pub async fn merchant_totals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = guarded!(principal, Operation::MerchantTotals, id);
    respond(StatusCode::OK, services.merchants.totals(id).await)
}

pub async fn create_merchant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CreateMerchant>, JsonRejection>,
) -> Response {
    guarded!(principal, Operation::CreateMerchant);
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    respond(
        StatusCode::CREATED,
        services.merchants.create(body, principal.user_id()).await,
    )
}

pub async fn update_merchant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateMerchant>, JsonRejection>,
) -> Response {
    let id = guarded!(principal, Operation::UpdateMerchant, id);
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    respond(
        StatusCode::OK,
        services.merchants.update(id, body, principal.user_id()).await,
    )
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Response {
    let id = guarded!(principal, Operation::UpdateMerchantStatus, id);
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    respond(
        StatusCode::OK,
        services
            .merchants
            .update_status(id, &body.status, principal.user_id())
            .await,
    )
}

pub async fn delete_merchant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = guarded!(principal, Operation::DeleteMerchant, id);
    respond(
        StatusCode::OK,
        services.merchants.delete(id, principal.user_id()).await,
    )
}

pub async fn export_merchants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Response {
    guarded!(principal, Operation::ExportMerchants);
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::query_rejection(rejection),
    };
    let format = match query.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::default(),
        Some(Ok(format)) => format,
        Some(Err(err)) => return errors::domain_error_to_response(err),
    };

    match services.merchants.export(format).await {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, file.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.file_name),
                ),
            ],
            file.bytes,
        )
            .into_response(),
        Err(err) => errors::domain_error_to_response(err),
    }
}
