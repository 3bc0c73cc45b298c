//! Postgres-backed catalog store.
//!
//! Each [`PostgresCatalogTx`] wraps one `sqlx` transaction. Bulk link inserts
//! use a single `INSERT ... SELECT UNNEST($2)` statement and removals a single
//! `DELETE ... WHERE id = ANY($1)`.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (other) | Any other | `Other` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |
//! | Other | N/A | `Other` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use storefront_catalog::{
    Category, NewCategory, NewProduct, NewTag, Product, ProductPatch, ProductSummary,
    ProductTagLink, Tag,
};
use storefront_core::{CategoryId, ProductId, ProductTagId, TagId};

use super::r#trait::{CatalogStore, CatalogTx, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_catalog.sql");

/// Postgres-backed catalog store.
///
/// ## Thread Safety
///
/// Uses SQLx connection pool which is thread-safe (Arc + Send + Sync).
///
/// ## Concurrency
///
/// `lock_product` issues `SELECT ... FOR UPDATE`, so two transactions
/// reconciling the tags of the same product serialize on the product row.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    /// Create a new PostgresCatalogStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    type Tx = PostgresCatalogTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresCatalogTx { tx })
    }
}

/// Open Postgres transaction. `sqlx` rolls it back on drop unless committed.
pub struct PostgresCatalogTx {
    tx: Transaction<'static, Postgres>,
}

const PRODUCT_COLUMNS: &str = "id, product_name, price, stock, category_id";

#[async_trait]
impl CatalogTx for PostgresCatalogTx {
    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, category_name FROM category ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        collect_rows(rows, category_from_row, "list_categories")
    }

    async fn find_category(&mut self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query("SELECT id, category_name FROM category WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_category", e))?;
        row.map(|r| category_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("find_category", e))
    }

    #[instrument(skip(self, new), err)]
    async fn insert_category(&mut self, new: &NewCategory) -> Result<Category, StoreError> {
        let row = sqlx::query(
            "INSERT INTO category (category_name) VALUES ($1) RETURNING id, category_name",
        )
        .bind(new.category_name())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        category_from_row(&row).map_err(|e| map_sqlx_error("insert_category", e))
    }

    #[instrument(skip(self, name), fields(category_id = %id), err)]
    async fn rename_category(
        &mut self,
        id: CategoryId,
        name: &NewCategory,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE category SET category_name = $2 WHERE id = $1")
            .bind(id.get())
            .bind(name.category_name())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("rename_category", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&mut self, id: CategoryId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected())
    }

    async fn products_in_category(
        &mut self,
        id: CategoryId,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let rows =
            sqlx::query("SELECT id, product_name FROM product WHERE category_id = $1 ORDER BY id")
                .bind(id.get())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("products_in_category", e))?;
        collect_rows(rows, summary_from_row, "products_in_category")
    }

    async fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query("SELECT id, tag_name FROM tag ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_tags", e))?;
        collect_rows(rows, tag_from_row, "list_tags")
    }

    async fn find_tag(&mut self, id: TagId) -> Result<Option<Tag>, StoreError> {
        let row = sqlx::query("SELECT id, tag_name FROM tag WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_tag", e))?;
        row.map(|r| tag_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("find_tag", e))
    }

    #[instrument(skip(self, new), err)]
    async fn insert_tag(&mut self, new: &NewTag) -> Result<Tag, StoreError> {
        let row = sqlx::query("INSERT INTO tag (tag_name) VALUES ($1) RETURNING id, tag_name")
            .bind(new.tag_name())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_tag", e))?;
        tag_from_row(&row).map_err(|e| map_sqlx_error("insert_tag", e))
    }

    #[instrument(skip(self, name), fields(tag_id = %id), err)]
    async fn rename_tag(&mut self, id: TagId, name: &NewTag) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE tag SET tag_name = $2 WHERE id = $1")
            .bind(id.get())
            .bind(name.tag_name())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("rename_tag", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    async fn delete_tag(&mut self, id: TagId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_tag", e))?;
        Ok(result.rows_affected())
    }

    async fn products_with_tag(&mut self, id: TagId) -> Result<Vec<ProductSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.product_name
            FROM product_tag pt
            JOIN product p ON p.id = pt.product_id
            WHERE pt.tag_id = $1
            ORDER BY pt.id
            "#,
        )
        .bind(id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("products_with_tag", e))?;
        collect_rows(rows, summary_from_row, "products_with_tag")
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product ORDER BY id"))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        collect_rows(rows, product_from_row, "list_products")
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;
        row.map(|r| product_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("find_product", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?;
        row.map(|r| product_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("lock_product", e))
    }

    #[instrument(skip(self, new), err)]
    async fn insert_product(&mut self, new: &NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO product (product_name, price, stock, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(new.product_name())
        .bind(new.price())
        .bind(new.stock())
        .bind(new.category_id().map(CategoryId::get))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        product_from_row(&row).map_err(|e| map_sqlx_error("insert_product", e))
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    async fn update_product(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE product SET
                product_name = COALESCE($2, product_name),
                price = COALESCE($3, price),
                stock = COALESCE($4, stock),
                category_id = COALESCE($5, category_id)
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(patch.product_name())
        .bind(patch.price())
        .bind(patch.stock())
        .bind(patch.category_id().map(CategoryId::get))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected())
    }

    async fn product_tag_links(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<ProductTagLink>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, product_id, tag_id FROM product_tag WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("product_tag_links", e))?;
        collect_rows(rows, link_from_row, "product_tag_links")
    }

    async fn tags_for_product(&mut self, product_id: ProductId) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.tag_name
            FROM product_tag pt
            JOIN tag t ON t.id = pt.tag_id
            WHERE pt.product_id = $1
            ORDER BY pt.id
            "#,
        )
        .bind(product_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("tags_for_product", e))?;
        collect_rows(rows, tag_from_row, "tags_for_product")
    }

    async fn list_product_tags(&mut self) -> Result<Vec<(ProductId, Tag)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT pt.product_id, t.id, t.tag_name
            FROM product_tag pt
            JOIN tag t ON t.id = pt.tag_id
            ORDER BY pt.id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_product_tags", e))?;
        collect_rows(
            rows,
            |row| {
                let product_id = ProductId::new(row.try_get("product_id")?);
                Ok((product_id, tag_from_row(row)?))
            },
            "list_product_tags",
        )
    }

    #[instrument(skip(self, tag_ids), fields(product_id = %product_id, count = tag_ids.len()), err)]
    async fn insert_product_tags(
        &mut self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<Vec<ProductTagLink>, StoreError> {
        let raw: Vec<i64> = tag_ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            r#"
            INSERT INTO product_tag (product_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::bigint[]) AS input(tag_id)
            RETURNING id, product_id, tag_id
            "#,
        )
        .bind(product_id.get())
        .bind(raw)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product_tags", e))?;

        let mut links = collect_rows(rows, link_from_row, "insert_product_tags")?;
        links.sort_by_key(|l| l.id);
        Ok(links)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn delete_product_tag_links(&mut self, ids: &[ProductTagId]) -> Result<u64, StoreError> {
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let result = sqlx::query("DELETE FROM product_tag WHERE id = ANY($1)")
            .bind(raw)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product_tag_links", e))?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

// Row mapping

fn collect_rows<T>(
    rows: Vec<PgRow>,
    map: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
    operation: &str,
) -> Result<Vec<T>, StoreError> {
    rows.iter()
        .map(|r| map(r).map_err(|e| map_sqlx_error(operation, e)))
        .collect()
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        category_name: row.try_get("category_name")?,
    })
}

fn tag_from_row(row: &PgRow) -> Result<Tag, sqlx::Error> {
    Ok(Tag {
        id: TagId::new(row.try_get("id")?),
        tag_name: row.try_get("tag_name")?,
    })
}

fn summary_from_row(row: &PgRow) -> Result<ProductSummary, sqlx::Error> {
    Ok(ProductSummary {
        id: ProductId::new(row.try_get("id")?),
        product_name: row.try_get("product_name")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        product_name: row.try_get("product_name")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        category_id: row
            .try_get::<Option<i64>, _>("category_id")?
            .map(CategoryId::new),
    })
}

fn link_from_row(row: &PgRow) -> Result<ProductTagLink, sqlx::Error> {
    Ok(ProductTagLink {
        id: ProductTagId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        tag_id: TagId::new(row.try_get("tag_id")?),
    })
}

/// Map a SQLx error onto the store's error kinds.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = match db_err.constraint() {
                Some(constraint) => format!(
                    "database error in {}: {} (constraint {})",
                    operation,
                    db_err.message(),
                    constraint
                ),
                None => format!("database error in {}: {}", operation, db_err.message()),
            };

            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                _ => StoreError::Other(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => {
            StoreError::Unavailable(format!("tls error in {}: {}", operation, e))
        }
        _ => StoreError::Other(format!("sqlx error in {}: {}", operation, err)),
    }
}
