use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_core::CategoryId;
use storefront_infra::{CatalogService, CatalogStore};

use crate::app::routes::common::{bad_body, parse_id};
use crate::app::{dto, errors};

pub fn router<S>() -> Router
where
    S: CatalogStore + 'static,
{
    Router::new()
        .route("/", get(list_categories::<S>).post(create_category::<S>))
        .route(
            "/:id",
            get(get_category::<S>)
                .put(rename_category::<S>)
                .delete(delete_category::<S>),
        )
}

/// Every category with its product summaries; `404` when there are none.
pub async fn list_categories<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    match service.list_categories().await {
        Ok(items) if items.is_empty() => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", "no categories found")
        }
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_category<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match service.get_category(id).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_category<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    body: Result<Json<dto::CategoryRequest>, JsonRejection>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let new = match body {
        Ok(Json(b)) => match b.into_new_category() {
            Ok(n) => n,
            Err(e) => return errors::domain_error_to_response(e),
        },
        Err(rejection) => return bad_body(rejection),
    };
    match service.create_category(&new).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn rename_category<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
    body: Result<Json<dto::CategoryRequest>, JsonRejection>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let name = match body {
        Ok(Json(b)) => match b.into_new_category() {
            Ok(n) => n,
            Err(e) => return errors::domain_error_to_response(e),
        },
        Err(rejection) => return bad_body(rejection),
    };
    match service.rename_category(id, &name).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_category<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match service.delete_category(id).await {
        Ok(rows) => (StatusCode::OK, Json(dto::MessageResponse::deleted("Category", rows))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
