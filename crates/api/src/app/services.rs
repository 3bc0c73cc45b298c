use std::sync::Arc;

use axum::{Extension, Router};
use tracing::info;

use storefront_infra::{
    CatalogService, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError,
};

use crate::app::routes;
use crate::config::StoreConfig;

/// The catalog service the process runs on, one variant per store engine.
///
/// Handlers are generic over the store; this enum only picks which
/// instantiation of the router gets mounted.
#[derive(Clone)]
pub enum AppServices {
    InMemory(Arc<CatalogService<InMemoryCatalogStore>>),
    Persistent(Arc<CatalogService<PostgresCatalogStore>>),
}

impl AppServices {
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(CatalogService::new(InMemoryCatalogStore::new())))
    }

    /// Build the services for `config`. The PostgreSQL variant connects the
    /// pool and applies the bundled schema before returning.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        match config {
            StoreConfig::InMemory => {
                info!("using in-memory catalog store");
                Ok(Self::in_memory())
            }
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let store = PostgresCatalogStore::connect(database_url, *max_connections).await?;
                store.ensure_schema().await?;
                info!(max_connections, "using postgres catalog store");
                Ok(Self::Persistent(Arc::new(CatalogService::new(store))))
            }
        }
    }

    pub fn store_kind(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in_memory",
            Self::Persistent(_) => "postgres",
        }
    }

    /// Catalog routes bound to this service.
    pub fn router(&self) -> Router {
        match self {
            Self::InMemory(service) => mount(service.clone()),
            Self::Persistent(service) => mount(service.clone()),
        }
    }
}

fn mount<S>(service: Arc<CatalogService<S>>) -> Router
where
    S: CatalogStore + 'static,
{
    routes::router::<S>().layer(Extension(service))
}
