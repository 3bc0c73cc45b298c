use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_core::TagId;
use storefront_infra::{CatalogService, CatalogStore};

use crate::app::routes::common::{bad_body, parse_id};
use crate::app::{dto, errors};

pub fn router<S>() -> Router
where
    S: CatalogStore + 'static,
{
    Router::new()
        .route("/", get(list_tags::<S>).post(create_tag::<S>))
        .route(
            "/:id",
            get(get_tag::<S>)
                .put(rename_tag::<S>)
                .delete(delete_tag::<S>),
        )
}

pub async fn list_tags<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    match service.list_tags().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_tag<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: TagId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match service.get_tag(id).await {
        Ok(tag) => (StatusCode::OK, Json(tag)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_tag<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    body: Result<Json<dto::TagRequest>, JsonRejection>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let new = match body {
        Ok(Json(b)) => match b.into_new_tag() {
            Ok(n) => n,
            Err(e) => return errors::domain_error_to_response(e),
        },
        Err(rejection) => return bad_body(rejection),
    };
    match service.create_tag(&new).await {
        Ok(tag) => (StatusCode::CREATED, Json(tag)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn rename_tag<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
    body: Result<Json<dto::TagRequest>, JsonRejection>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: TagId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let name = match body {
        Ok(Json(b)) => match b.into_new_tag() {
            Ok(n) => n,
            Err(e) => return errors::domain_error_to_response(e),
        },
        Err(rejection) => return bad_body(rejection),
    };
    match service.rename_tag(id, &name).await {
        Ok(tag) => (StatusCode::OK, Json(tag)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_tag<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: TagId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match service.delete_tag(id).await {
        Ok(rows) => (StatusCode::OK, Json(dto::MessageResponse::deleted("Tag", rows))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
