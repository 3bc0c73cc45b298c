use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use storefront_catalog::{
    Category, NewCategory, NewProduct, NewTag, Product, ProductPatch, ProductSummary,
    ProductTagLink, Tag,
};
use storefront_core::{CategoryId, Entity, ProductId, ProductTagId, TagId};

use super::r#trait::{CatalogStore, CatalogTx, StoreError};

/// One table: rows keyed (and therefore ordered) by id, with an autoincrement counter.
#[derive(Debug, Clone)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    last_id: i64,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<E: Entity + Clone> Table<E> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn get(&self, id: E::Id) -> Option<&E> {
        self.rows.get(&id)
    }

    fn get_mut(&mut self, id: E::Id) -> Option<&mut E> {
        self.rows.get_mut(&id)
    }

    fn contains(&self, id: E::Id) -> bool {
        self.rows.contains_key(&id)
    }

    fn insert(&mut self, row: E) {
        self.rows.insert(row.id(), row);
    }

    fn remove(&mut self, id: E::Id) -> Option<E> {
        self.rows.remove(&id)
    }

    fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) {
        self.rows.retain(|_, row| keep(row));
    }
}

#[derive(Debug, Clone, Default)]
struct CatalogState {
    categories: Table<Category>,
    products: Table<Product>,
    tags: Table<Tag>,
    links: Table<ProductTagLink>,
}

impl CatalogState {
    fn summary(&self, id: ProductId) -> Option<ProductSummary> {
        self.products.get(id).map(ProductSummary::from)
    }

    fn ensure_category(&self, id: Option<CategoryId>) -> Result<(), StoreError> {
        match id {
            Some(id) if !self.categories.contains(id) => Err(StoreError::ForeignKeyViolation(
                format!("product.category_id references missing category {id}"),
            )),
            _ => Ok(()),
        }
    }

    fn category_name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| c.category_name == name && Some(c.id) != except)
    }

    fn tag_name_taken(&self, name: &str, except: Option<TagId>) -> bool {
        self.tags
            .values()
            .any(|t| t.tag_name == name && Some(t.id) != except)
    }
}

/// In-memory catalog store.
///
/// Intended for tests/dev. A transaction holds the store's single lock for its
/// whole lifetime, so transactions are fully serialized. Rollback restores a
/// snapshot taken at `begin`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<Mutex<CatalogState>>,
    link_writes: Arc<AtomicU64>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of link-table write statements (inserts and deletes) issued so
    /// far, including ones later rolled back.
    pub fn link_writes(&self) -> u64 {
        self.link_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    type Tx = InMemoryCatalogTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let state = self.state.clone().lock_owned().await;
        let snapshot = state.clone();
        Ok(InMemoryCatalogTx {
            state,
            snapshot: Some(snapshot),
            link_writes: self.link_writes.clone(),
        })
    }
}

/// Open in-memory transaction. Rolls back on drop unless committed.
#[derive(Debug)]
pub struct InMemoryCatalogTx {
    state: OwnedMutexGuard<CatalogState>,
    snapshot: Option<CatalogState>,
    link_writes: Arc<AtomicU64>,
}

impl InMemoryCatalogTx {
    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }

    fn count_link_write(&self) {
        self.link_writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for InMemoryCatalogTx {
    fn drop(&mut self) {
        self.restore();
    }
}

#[async_trait]
impl CatalogTx for InMemoryCatalogTx {
    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        Ok(self.state.categories.values().cloned().collect())
    }

    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.state.categories.get(id).cloned())
    }

    async fn insert_category(&mut self, new: &NewCategory) -> Result<Category, StoreError> {
        if self.state.category_name_taken(new.category_name(), None) {
            return Err(StoreError::UniqueViolation(format!(
                "category_name '{}' already exists",
                new.category_name()
            )));
        }
        let category = Category {
            id: CategoryId::new(self.state.categories.next_id()),
            category_name: new.category_name().to_string(),
        };
        self.state.categories.insert(category.clone());
        Ok(category)
    }

    async fn rename_category(
        &mut self,
        id: CategoryId,
        name: &NewCategory,
    ) -> Result<u64, StoreError> {
        if !self.state.categories.contains(id) {
            return Ok(0);
        }
        if self.state.category_name_taken(name.category_name(), Some(id)) {
            return Err(StoreError::UniqueViolation(format!(
                "category_name '{}' already exists",
                name.category_name()
            )));
        }
        if let Some(category) = self.state.categories.get_mut(id) {
            category.category_name = name.category_name().to_string();
        }
        Ok(1)
    }

    async fn delete_category(&mut self, id: CategoryId) -> Result<u64, StoreError> {
        if self.state.categories.remove(id).is_none() {
            return Ok(0);
        }
        for product in self.state.products.rows.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(1)
    }

    async fn products_in_category(
        &mut self,
        id: CategoryId,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        Ok(self
            .state
            .products
            .values()
            .filter(|p| p.category_id == Some(id))
            .map(ProductSummary::from)
            .collect())
    }

    async fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError> {
        Ok(self.state.tags.values().cloned().collect())
    }

    async fn find_tag(&mut self, id: TagId) -> Result<Option<Tag>, StoreError> {
        Ok(self.state.tags.get(id).cloned())
    }

    async fn insert_tag(&mut self, new: &NewTag) -> Result<Tag, StoreError> {
        if self.state.tag_name_taken(new.tag_name(), None) {
            return Err(StoreError::UniqueViolation(format!(
                "tag_name '{}' already exists",
                new.tag_name()
            )));
        }
        let tag = Tag {
            id: TagId::new(self.state.tags.next_id()),
            tag_name: new.tag_name().to_string(),
        };
        self.state.tags.insert(tag.clone());
        Ok(tag)
    }

    async fn rename_tag(&mut self, id: TagId, name: &NewTag) -> Result<u64, StoreError> {
        if !self.state.tags.contains(id) {
            return Ok(0);
        }
        if self.state.tag_name_taken(name.tag_name(), Some(id)) {
            return Err(StoreError::UniqueViolation(format!(
                "tag_name '{}' already exists",
                name.tag_name()
            )));
        }
        if let Some(tag) = self.state.tags.get_mut(id) {
            tag.tag_name = name.tag_name().to_string();
        }
        Ok(1)
    }

    async fn delete_tag(&mut self, id: TagId) -> Result<u64, StoreError> {
        if self.state.tags.remove(id).is_none() {
            return Ok(0);
        }
        self.state.links.retain(|l| l.tag_id != id);
        Ok(1)
    }

    async fn products_with_tag(&mut self, id: TagId) -> Result<Vec<ProductSummary>, StoreError> {
        let state = &*self.state;
        Ok(state
            .links
            .values()
            .filter(|l| l.tag_id == id)
            .filter_map(|l| state.summary(l.product_id))
            .collect())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        Ok(self.state.products.values().cloned().collect())
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.state.products.get(id).cloned())
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        // The whole store is already exclusively held by this transaction.
        self.find_product(id).await
    }

    async fn insert_product(&mut self, new: &NewProduct) -> Result<Product, StoreError> {
        self.state.ensure_category(new.category_id())?;
        let id = ProductId::new(self.state.products.next_id());
        let product = new.clone().into_product(id);
        self.state.products.insert(product.clone());
        Ok(product)
    }

    async fn update_product(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<u64, StoreError> {
        if !self.state.products.contains(id) {
            return Ok(0);
        }
        self.state.ensure_category(patch.category_id())?;
        if let Some(product) = self.state.products.get_mut(id) {
            patch.apply_to(product);
        }
        Ok(1)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError> {
        if self.state.products.remove(id).is_none() {
            return Ok(0);
        }
        self.state.links.retain(|l| l.product_id != id);
        Ok(1)
    }

    async fn product_tag_links(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<ProductTagLink>, StoreError> {
        Ok(self
            .state
            .links
            .values()
            .filter(|l| l.product_id == product_id)
            .copied()
            .collect())
    }

    async fn tags_for_product(&mut self, product_id: ProductId) -> Result<Vec<Tag>, StoreError> {
        let state = &*self.state;
        Ok(state
            .links
            .values()
            .filter(|l| l.product_id == product_id)
            .filter_map(|l| state.tags.get(l.tag_id).cloned())
            .collect())
    }

    async fn list_product_tags(&mut self) -> Result<Vec<(ProductId, Tag)>, StoreError> {
        let state = &*self.state;
        Ok(state
            .links
            .values()
            .filter_map(|l| state.tags.get(l.tag_id).map(|t| (l.product_id, t.clone())))
            .collect())
    }

    async fn insert_product_tags(
        &mut self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<Vec<ProductTagLink>, StoreError> {
        self.count_link_write();

        if !self.state.products.contains(product_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "product_tag.product_id references missing product {product_id}"
            )));
        }

        let mut inserted = Vec::with_capacity(tag_ids.len());
        for &tag_id in tag_ids {
            if !self.state.tags.contains(tag_id) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "product_tag.tag_id references missing tag {tag_id}"
                )));
            }
            let duplicate = self
                .state
                .links
                .values()
                .any(|l| l.product_id == product_id && l.tag_id == tag_id);
            if duplicate {
                return Err(StoreError::UniqueViolation(format!(
                    "product {product_id} is already linked to tag {tag_id}"
                )));
            }

            let link = ProductTagLink {
                id: ProductTagId::new(self.state.links.next_id()),
                product_id,
                tag_id,
            };
            self.state.links.insert(link);
            inserted.push(link);
        }
        Ok(inserted)
    }

    async fn delete_product_tag_links(&mut self, ids: &[ProductTagId]) -> Result<u64, StoreError> {
        self.count_link_write();

        let mut removed = 0;
        for &id in ids {
            if self.state.links.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn commit(mut self) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        self.restore();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> NewTag {
        NewTag::new(Some(name.to_string())).unwrap()
    }

    fn product(name: &str) -> NewProduct {
        NewProduct::new(Some(name.to_string()), Some(9.99), None, None).unwrap()
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_transactions() {
        let store = InMemoryCatalogStore::new();

        let mut tx = store.begin().await.unwrap();
        let t = tx.insert_tag(&tag("red")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_tag(t.id).await.unwrap(), Some(t));
    }

    #[tokio::test]
    async fn rollback_restores_snapshot() {
        let store = InMemoryCatalogStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_tag(&tag("red")).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryCatalogStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_product(&product("Cap")).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_are_unique_violations() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_tag(&tag("red")).await.unwrap();

        let err = tx.insert_tag(&tag("red")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn links_to_unknown_tags_are_foreign_key_violations() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let p = tx.insert_product(&product("Cap")).await.unwrap();

        let err = tx
            .insert_product_tags(p.id, &[TagId::new(999)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn duplicate_link_pair_is_rejected() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let p = tx.insert_product(&product("Cap")).await.unwrap();
        let t = tx.insert_tag(&tag("red")).await.unwrap();
        tx.insert_product_tags(p.id, &[t.id]).await.unwrap();

        let err = tx.insert_product_tags(p.id, &[t.id]).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn deleting_tag_cascades_to_links() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let p = tx.insert_product(&product("Cap")).await.unwrap();
        let t = tx.insert_tag(&tag("red")).await.unwrap();
        tx.insert_product_tags(p.id, &[t.id]).await.unwrap();

        assert_eq!(tx.delete_tag(t.id).await.unwrap(), 1);
        assert!(tx.product_tag_links(p.id).await.unwrap().is_empty());
        assert!(tx.find_product(p.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_category_detaches_products() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let c = tx
            .insert_category(&NewCategory::new(Some("Hats".to_string())).unwrap())
            .await
            .unwrap();
        let p = tx
            .insert_product(
                &NewProduct::new(Some("Cap".to_string()), Some(5.0), None, Some(c.id)).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(tx.delete_category(c.id).await.unwrap(), 1);
        assert_eq!(tx.find_product(p.id).await.unwrap().unwrap().category_id, None);
    }

    #[tokio::test]
    async fn missing_rows_report_zero() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();

        assert_eq!(tx.delete_product(ProductId::new(1)).await.unwrap(), 0);
        assert_eq!(
            tx.update_product(ProductId::new(1), &ProductPatch::default())
                .await
                .unwrap(),
            0
        );
        assert_eq!(tx.rename_tag(TagId::new(1), &tag("x")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn link_writes_are_counted_per_statement() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let p = tx.insert_product(&product("Cap")).await.unwrap();
        let a = tx.insert_tag(&tag("a")).await.unwrap();
        let b = tx.insert_tag(&tag("b")).await.unwrap();

        let links = tx.insert_product_tags(p.id, &[a.id, b.id]).await.unwrap();
        tx.delete_product_tag_links(&[links[0].id]).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.link_writes(), 2);
    }
}
