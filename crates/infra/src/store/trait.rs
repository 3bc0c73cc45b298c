use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use storefront_catalog::{
    Category, NewCategory, NewProduct, NewTag, Product, ProductPatch, ProductSummary,
    ProductTagLink, Tag,
};
use storefront_core::{CategoryId, ProductId, ProductTagId, TagId};

/// Store operation error.
///
/// The variant is the error kind: callers branch on it (e.g. unique violation
/// → HTTP 409) instead of inspecting driver-specific messages.
///
/// ## Error Categories
///
/// - **Unavailable**: The store could not be reached (pool closed, IO, timeout)
/// - **UniqueViolation**: A unique constraint rejected the write (duplicate name, duplicate link)
/// - **ForeignKeyViolation**: A reference points at a missing row (unknown tag or category)
/// - **Other**: Anything else the store reported
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("store error: {0}")]
    Other(String),
}

/// Source of transaction scopes over the catalog tables.
///
/// Implementations must give each transaction at least read-committed
/// isolation and must make [`CatalogTx::lock_product`] exclusive against other
/// transactions locking the same product until commit or rollback.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    type Tx: CatalogTx;

    /// Open a new atomic scope.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }
}

/// One open transaction over the catalog tables.
///
/// Writes become visible to other transactions only after [`commit`](Self::commit).
/// Dropping a transaction without committing rolls it back.
///
/// Row-count returning operations report how many rows matched; `0` means the
/// target does not exist and nothing was written.
#[async_trait]
pub trait CatalogTx: Send {
    // Categories

    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError>;

    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    async fn insert_category(&mut self, new: &NewCategory) -> Result<Category, StoreError>;

    async fn rename_category(
        &mut self,
        id: CategoryId,
        name: &NewCategory,
    ) -> Result<u64, StoreError>;

    /// Delete a category; products filed under it keep existing with no category.
    async fn delete_category(&mut self, id: CategoryId) -> Result<u64, StoreError>;

    async fn products_in_category(
        &mut self,
        id: CategoryId,
    ) -> Result<Vec<ProductSummary>, StoreError>;

    // Tags

    async fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError>;

    async fn find_tag(&mut self, id: TagId) -> Result<Option<Tag>, StoreError>;

    async fn insert_tag(&mut self, new: &NewTag) -> Result<Tag, StoreError>;

    async fn rename_tag(&mut self, id: TagId, name: &NewTag) -> Result<u64, StoreError>;

    /// Delete a tag and every link row referencing it.
    async fn delete_tag(&mut self, id: TagId) -> Result<u64, StoreError>;

    async fn products_with_tag(&mut self, id: TagId) -> Result<Vec<ProductSummary>, StoreError>;

    // Products

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError>;

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Read a product and hold an exclusive lock on it until the transaction ends.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&mut self, new: &NewProduct) -> Result<Product, StoreError>;

    async fn update_product(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<u64, StoreError>;

    /// Delete a product and every link row referencing it.
    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError>;

    // Product–tag links

    /// Link rows of one product, ordered by link id.
    async fn product_tag_links(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<ProductTagLink>, StoreError>;

    /// Tags linked to one product, ordered by link id.
    async fn tags_for_product(&mut self, product_id: ProductId) -> Result<Vec<Tag>, StoreError>;

    /// Every (product, tag) edge, ordered by link id.
    async fn list_product_tags(&mut self) -> Result<Vec<(ProductId, Tag)>, StoreError>;

    /// Insert one link row per tag id in a single statement.
    async fn insert_product_tags(
        &mut self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<Vec<ProductTagLink>, StoreError>;

    async fn delete_product_tag_links(&mut self, ids: &[ProductTagId]) -> Result<u64, StoreError>;

    // Scope

    async fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;

    async fn rollback(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
