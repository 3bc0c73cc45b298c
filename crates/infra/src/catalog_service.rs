//! Catalog use cases (application-level orchestration).
//!
//! Every operation runs inside one [`CatalogTx`]. Single-table operations are
//! thin; product writes are where the work is:
//!
//! ```text
//! update_product(id, patch, tagIds)
//!   ↓
//! 1. Lock product row (missing → NotFound, nothing written)
//!   ↓
//! 2. Apply scalar patch
//!   ↓
//! 3. Read current link rows (same transaction)
//!   ↓
//! 4. reconcile(current, desired) → {to_add, to_remove}
//!   ↓
//! 5. Delete to_remove links, bulk-insert to_add links
//!   ↓
//! 6. Commit (any failure in 1-5 → rollback everything) and re-read
//! ```
//!
//! Errors raised inside the transaction are returned unchanged after the
//! rollback; nothing is retried.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use storefront_catalog::{
    Category, CategoryDetails, NewCategory, NewProduct, NewTag, Product, ProductDetails,
    ProductPatch, ProductSummary, ProductTagLink, Tag, TagDelta, TagDetails, reconcile,
};
use storefront_core::{CategoryId, DomainError, ProductId, ProductTagId, TagId};

use crate::store::{CatalogStore, CatalogTx, StoreError};

/// Catalog operation error: either a domain rule or the store said no.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result of a product creation: the row plus the link rows inserted with it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedProduct {
    pub product: Product,
    pub links: Vec<ProductTagLink>,
}

/// Result of a product update: the refreshed product and the applied delta.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub product: ProductDetails,
    pub delta: TagDelta,
}

/// Catalog operations over any [`CatalogStore`].
///
/// The store handle is injected, so tests run against an isolated
/// in-memory store and production against Postgres.
#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S> CatalogService<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -------------------------
    // Categories
    // -------------------------

    pub async fn list_categories(&self) -> CatalogResult<Vec<CategoryDetails>> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            let categories = tx.list_categories().await?;
            let products = tx.list_products().await?;
            Ok::<_, StoreError>((categories, products))
        }
        .await
        .map_err(CatalogError::from);
        let (categories, products) = finish(tx, outcome, "list_categories").await?;

        let mut by_category: HashMap<CategoryId, Vec<ProductSummary>> = HashMap::new();
        for p in &products {
            if let Some(category_id) = p.category_id {
                by_category
                    .entry(category_id)
                    .or_default()
                    .push(ProductSummary::from(p));
            }
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryDetails {
                products: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }

    pub async fn get_category(&self, id: CategoryId) -> CatalogResult<CategoryDetails> {
        let mut tx = self.store.begin().await?;
        let outcome = load_category(&mut tx, id).await;
        finish(tx, outcome, "get_category").await
    }

    #[instrument(skip(self, new), err)]
    pub async fn create_category(&self, new: &NewCategory) -> CatalogResult<Category> {
        let mut tx = self.store.begin().await?;
        let outcome = tx.insert_category(new).await.map_err(CatalogError::from);
        finish(tx, outcome, "create_category").await
    }

    #[instrument(skip(self, name), fields(category_id = %id), err)]
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &NewCategory,
    ) -> CatalogResult<Category> {
        let mut tx = self.store.begin().await?;
        let outcome = rename_and_reload_category(&mut tx, id, name).await;
        finish(tx, outcome, "rename_category").await
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    pub async fn delete_category(&self, id: CategoryId) -> CatalogResult<u64> {
        let mut tx = self.store.begin().await?;
        let outcome = delete_or_not_found(tx.delete_category(id).await, "category");
        finish(tx, outcome, "delete_category").await
    }

    // -------------------------
    // Tags
    // -------------------------

    pub async fn list_tags(&self) -> CatalogResult<Vec<TagDetails>> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            let tags = tx.list_tags().await?;
            let edges = tx.list_product_tags().await?;
            let products = tx.list_products().await?;
            Ok::<_, StoreError>((tags, edges, products))
        }
        .await
        .map_err(CatalogError::from);
        let (tags, edges, products) = finish(tx, outcome, "list_tags").await?;

        let summaries: HashMap<ProductId, ProductSummary> = products
            .iter()
            .map(|p| (p.id, ProductSummary::from(p)))
            .collect();
        let mut by_tag: HashMap<TagId, Vec<ProductSummary>> = HashMap::new();
        for (product_id, tag) in edges {
            if let Some(summary) = summaries.get(&product_id) {
                by_tag.entry(tag.id).or_default().push(summary.clone());
            }
        }

        Ok(tags
            .into_iter()
            .map(|tag| TagDetails {
                products: by_tag.remove(&tag.id).unwrap_or_default(),
                tag,
            })
            .collect())
    }

    pub async fn get_tag(&self, id: TagId) -> CatalogResult<TagDetails> {
        let mut tx = self.store.begin().await?;
        let outcome = load_tag(&mut tx, id).await;
        finish(tx, outcome, "get_tag").await
    }

    #[instrument(skip(self, new), err)]
    pub async fn create_tag(&self, new: &NewTag) -> CatalogResult<Tag> {
        let mut tx = self.store.begin().await?;
        let outcome = tx.insert_tag(new).await.map_err(CatalogError::from);
        finish(tx, outcome, "create_tag").await
    }

    #[instrument(skip(self, name), fields(tag_id = %id), err)]
    pub async fn rename_tag(&self, id: TagId, name: &NewTag) -> CatalogResult<Tag> {
        let mut tx = self.store.begin().await?;
        let outcome = rename_and_reload_tag(&mut tx, id, name).await;
        finish(tx, outcome, "rename_tag").await
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    pub async fn delete_tag(&self, id: TagId) -> CatalogResult<u64> {
        let mut tx = self.store.begin().await?;
        let outcome = delete_or_not_found(tx.delete_tag(id).await, "tag");
        finish(tx, outcome, "delete_tag").await
    }

    // -------------------------
    // Products
    // -------------------------

    pub async fn list_products(&self) -> CatalogResult<Vec<ProductDetails>> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            let products = tx.list_products().await?;
            let categories = tx.list_categories().await?;
            let edges = tx.list_product_tags().await?;
            Ok::<_, StoreError>((products, categories, edges))
        }
        .await
        .map_err(CatalogError::from);
        let (products, categories, edges) = finish(tx, outcome, "list_products").await?;

        let categories: HashMap<CategoryId, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();
        let mut tags: HashMap<ProductId, Vec<Tag>> = HashMap::new();
        for (product_id, tag) in edges {
            tags.entry(product_id).or_default().push(tag);
        }

        Ok(products
            .into_iter()
            .map(|product| ProductDetails {
                category: product
                    .category_id
                    .and_then(|id| categories.get(&id).cloned()),
                tags: tags.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }

    pub async fn get_product(&self, id: ProductId) -> CatalogResult<ProductDetails> {
        let mut tx = self.store.begin().await?;
        let outcome = load_product(&mut tx, id).await;
        finish(tx, outcome, "get_product").await
    }

    /// Insert a product and its initial tag links in one transaction.
    ///
    /// Duplicate tag ids are collapsed. An unknown tag id fails the whole
    /// creation; no product row is left behind.
    #[instrument(skip(self, new, tag_ids), err)]
    pub async fn create_product(
        &self,
        new: &NewProduct,
        tag_ids: Option<&[TagId]>,
    ) -> CatalogResult<CreatedProduct> {
        let mut tx = self.store.begin().await?;
        let outcome = insert_product_with_tags(&mut tx, new, tag_ids).await;
        finish(tx, outcome, "create_product").await
    }

    /// Update scalar fields and reconcile tags atomically.
    ///
    /// `tag_ids` of `None` or `Some(&[])` leaves the product's tags untouched.
    #[instrument(skip(self, patch, tag_ids), fields(product_id = %id), err)]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
        tag_ids: Option<&[TagId]>,
    ) -> CatalogResult<ProductUpdate> {
        let mut tx = self.store.begin().await?;
        let outcome = apply_product_update(&mut tx, id, patch, tag_ids).await;
        let delta = finish(tx, outcome, "update_product").await?;

        let product = self.get_product(id).await?;
        Ok(ProductUpdate { product, delta })
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> CatalogResult<u64> {
        let mut tx = self.store.begin().await?;
        let outcome = delete_or_not_found(tx.delete_product(id).await, "product");
        finish(tx, outcome, "delete_product").await
    }
}

/// Commit on success; roll back and hand back the original error otherwise.
async fn finish<T, R>(tx: T, outcome: CatalogResult<R>, operation: &'static str) -> CatalogResult<R>
where
    T: CatalogTx,
{
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            match tx.rollback().await {
                Ok(()) => warn!(operation, error = %err, "transaction rolled back"),
                Err(rollback_err) => warn!(
                    operation,
                    error = %err,
                    rollback_error = %rollback_err,
                    "transaction rollback failed"
                ),
            }
            Err(err)
        }
    }
}

fn delete_or_not_found(
    deleted: Result<u64, StoreError>,
    entity: &'static str,
) -> CatalogResult<u64> {
    match deleted? {
        0 => Err(DomainError::not_found(entity).into()),
        n => Ok(n),
    }
}

/// Current link rows of a product, read through the caller's transaction so
/// the view is consistent with the writes that follow.
pub async fn read_tag_links<T>(
    tx: &mut T,
    product_id: ProductId,
) -> Result<Vec<ProductTagLink>, StoreError>
where
    T: CatalogTx,
{
    tx.product_tag_links(product_id).await
}

/// Tag ids of a product's links, in link order.
pub async fn current_tag_ids<T>(tx: &mut T, product_id: ProductId) -> Result<Vec<TagId>, StoreError>
where
    T: CatalogTx,
{
    Ok(read_tag_links(tx, product_id)
        .await?
        .into_iter()
        .map(|l| l.tag_id)
        .collect())
}

async fn apply_product_update<T>(
    tx: &mut T,
    id: ProductId,
    patch: &ProductPatch,
    tag_ids: Option<&[TagId]>,
) -> CatalogResult<TagDelta>
where
    T: CatalogTx,
{
    if tx.lock_product(id).await?.is_none() {
        return Err(DomainError::not_found("product").into());
    }

    if !patch.is_empty() {
        tx.update_product(id, patch).await?;
    }

    let links = read_tag_links(tx, id).await?;
    let delta = reconcile(links.iter().map(|l| l.tag_id), tag_ids);

    if !delta.to_remove().is_empty() {
        let doomed: Vec<ProductTagId> = links
            .iter()
            .filter(|l| delta.to_remove().contains(&l.tag_id))
            .map(|l| l.id)
            .collect();
        tx.delete_product_tag_links(&doomed).await?;
    }
    if !delta.to_add().is_empty() {
        tx.insert_product_tags(id, &delta.sorted_additions()).await?;
    }

    debug!(
        product_id = %id,
        added = ?delta.sorted_additions(),
        removed = ?delta.sorted_removals(),
        "reconciled product tags"
    );
    Ok(delta)
}

async fn insert_product_with_tags<T>(
    tx: &mut T,
    new: &NewProduct,
    tag_ids: Option<&[TagId]>,
) -> CatalogResult<CreatedProduct>
where
    T: CatalogTx,
{
    let product = tx.insert_product(new).await?;

    let delta = reconcile(std::iter::empty::<TagId>(), tag_ids);
    let links = if delta.to_add().is_empty() {
        Vec::new()
    } else {
        tx.insert_product_tags(product.id, &delta.sorted_additions())
            .await?
    };

    Ok(CreatedProduct { product, links })
}

async fn load_product<T>(tx: &mut T, id: ProductId) -> CatalogResult<ProductDetails>
where
    T: CatalogTx,
{
    let product = tx
        .find_product(id)
        .await?
        .ok_or_else(|| DomainError::not_found("product"))?;
    let category = match product.category_id {
        Some(category_id) => tx.find_category(category_id).await?,
        None => None,
    };
    let tags = tx.tags_for_product(id).await?;

    Ok(ProductDetails {
        product,
        category,
        tags,
    })
}

async fn rename_and_reload_category<T>(
    tx: &mut T,
    id: CategoryId,
    name: &NewCategory,
) -> CatalogResult<Category>
where
    T: CatalogTx,
{
    if tx.rename_category(id, name).await? == 0 {
        return Err(DomainError::not_found("category").into());
    }
    Ok(tx
        .find_category(id)
        .await?
        .ok_or_else(|| DomainError::not_found("category"))?)
}

async fn rename_and_reload_tag<T>(tx: &mut T, id: TagId, name: &NewTag) -> CatalogResult<Tag>
where
    T: CatalogTx,
{
    if tx.rename_tag(id, name).await? == 0 {
        return Err(DomainError::not_found("tag").into());
    }
    Ok(tx
        .find_tag(id)
        .await?
        .ok_or_else(|| DomainError::not_found("tag"))?)
}

async fn load_category<T>(tx: &mut T, id: CategoryId) -> CatalogResult<CategoryDetails>
where
    T: CatalogTx,
{
    let category = tx
        .find_category(id)
        .await?
        .ok_or_else(|| DomainError::not_found("category"))?;
    let products = tx.products_in_category(id).await?;
    Ok(CategoryDetails { category, products })
}

async fn load_tag<T>(tx: &mut T, id: TagId) -> CatalogResult<TagDetails>
where
    T: CatalogTx,
{
    let tag = tx
        .find_tag(id)
        .await?
        .ok_or_else(|| DomainError::not_found("tag"))?;
    let products = tx.products_with_tag(id).await?;
    Ok(TagDetails { tag, products })
}
