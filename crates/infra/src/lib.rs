//! Infrastructure layer: catalog stores and the transactional catalog service.

pub mod catalog_service;
pub mod store;


pub use catalog_service::{
    CatalogError, CatalogResult, CatalogService, CreatedProduct, ProductUpdate, current_tag_ids,
    read_tag_links,
};
pub use store::{
    CatalogStore, CatalogTx, InMemoryCatalogStore, InMemoryCatalogTx, PostgresCatalogStore,
    PostgresCatalogTx, StoreError,
};
