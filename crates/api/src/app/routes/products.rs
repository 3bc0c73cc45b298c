use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_core::ProductId;
use storefront_infra::{CatalogService, CatalogStore};

use crate::app::routes::common::{bad_body, parse_id};
use crate::app::{dto, errors};

pub fn router<S>() -> Router
where
    S: CatalogStore + 'static,
{
    Router::new()
        .route("/", get(list_products::<S>).post(create_product::<S>))
        .route(
            "/:id",
            get(get_product::<S>)
                .put(update_product::<S>)
                .delete(delete_product::<S>),
        )
}

pub async fn list_products<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    match service.list_products().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match service.get_product(id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

/// `201` with the bare product, or `200` with the product and its link rows
/// when tags were supplied.
pub async fn create_product<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    let (new, tag_ids) = match body.into_new_product() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let created = match service.create_product(&new, tag_ids.as_deref()).await {
        Ok(c) => c,
        Err(e) => return errors::product_write_error_to_response(e),
    };

    if tag_ids.is_some_and(|ids| !ids.is_empty()) {
        let body = dto::ProductWithLinksResponse {
            product: created.product,
            links: created.links,
        };
        (StatusCode::OK, Json(body)).into_response()
    } else {
        (StatusCode::CREATED, Json(created.product)).into_response()
    }
}

pub async fn update_product<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };
    let (patch, tag_ids) = match body.into_patch() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match service.update_product(id, &patch, tag_ids.as_deref()).await {
        Ok(update) => (StatusCode::OK, Json(update.product)).into_response(),
        Err(e) => errors::product_write_error_to_response(e),
    }
}

pub async fn delete_product<S>(
    Extension(service): Extension<Arc<CatalogService<S>>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    S: CatalogStore + 'static,
{
    let id: ProductId = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match service.delete_product(id).await {
        Ok(rows) => (StatusCode::OK, Json(dto::MessageResponse::deleted("Product", rows))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
