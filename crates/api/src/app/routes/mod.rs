use axum::Router;

use storefront_infra::CatalogStore;

pub mod categories;
pub mod common;
pub mod products;
pub mod system;
pub mod tags;

/// Router for all catalog endpoints, generic over the backing store.
pub fn router<S>() -> Router
where
    S: CatalogStore + 'static,
{
    Router::new()
        .nest("/api/products", products::router::<S>())
        .nest("/api/categories", categories::router::<S>())
        .nest("/api/tags", tags::router::<S>())
}
