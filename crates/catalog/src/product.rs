use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainResult, Entity, ProductId};

use crate::category::Category;
use crate::tag::Tag;
use crate::validation;

/// Stock level given to a product created without an explicit `stock`.
pub const DEFAULT_STOCK: i32 = 10;

/// Product row (scalar fields only; tags live in the link table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Minimal product projection embedded in category and tag responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub product_name: String,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            product_name: p.product_name.clone(),
        }
    }
}

/// A product with its category and tags resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

/// Validated input for inserting a product row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    product_name: String,
    price: f64,
    stock: i32,
    category_id: Option<CategoryId>,
}

impl NewProduct {
    /// Validate creation input. `product_name` and `price` are required;
    /// `stock` falls back to [`DEFAULT_STOCK`].
    pub fn new(
        product_name: Option<String>,
        price: Option<f64>,
        stock: Option<i32>,
        category_id: Option<CategoryId>,
    ) -> DomainResult<Self> {
        let product_name = validation::required_name("product name", product_name)?;
        let price = price
            .ok_or_else(|| storefront_core::DomainError::validation("price is required"))
            .and_then(validation::price)?;
        let stock = validation::stock(stock.unwrap_or(DEFAULT_STOCK))?;

        Ok(Self {
            product_name,
            price,
            stock,
            category_id,
        })
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stock(&self) -> i32 {
        self.stock
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    /// Materialize the row once the store has assigned an id.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            product_name: self.product_name,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
        }
    }
}

/// Partial update of a product's scalar fields. Absent fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    product_name: Option<String>,
    price: Option<f64>,
    stock: Option<i32>,
    category_id: Option<CategoryId>,
}

impl ProductPatch {
    pub fn new(
        product_name: Option<String>,
        price: Option<f64>,
        stock: Option<i32>,
        category_id: Option<CategoryId>,
    ) -> DomainResult<Self> {
        let product_name = match product_name {
            Some(name) => Some(validation::required_name("product name", Some(name))?),
            None => None,
        };
        let price = price.map(validation::price).transpose()?;
        let stock = stock.map(validation::stock).transpose()?;

        Ok(Self {
            product_name,
            price,
            stock,
            category_id,
        })
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn stock(&self) -> Option<i32> {
        self.stock
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category_id.is_none()
    }

    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.product_name {
            product.product_name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{DomainError, TagId};

    fn basketball() -> Product {
        NewProduct::new(Some("Basketball".to_string()), Some(200.0), Some(3), None)
            .unwrap()
            .into_product(ProductId::new(5))
    }

    #[test]
    fn new_product_requires_name_and_price() {
        assert!(matches!(
            NewProduct::new(None, Some(1.0), None, None),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            NewProduct::new(Some("Hat".to_string()), None, None, None),
            Err(DomainError::Validation(msg)) if msg == "price is required"
        ));
    }

    #[test]
    fn new_product_defaults_stock() {
        let p = NewProduct::new(Some("Hat".to_string()), Some(22.99), None, None).unwrap();
        assert_eq!(p.stock(), DEFAULT_STOCK);
    }

    #[test]
    fn new_product_rejects_negative_and_non_finite_values() {
        assert!(NewProduct::new(Some("Hat".to_string()), Some(-1.0), None, None).is_err());
        assert!(NewProduct::new(Some("Hat".to_string()), Some(f64::NAN), None, None).is_err());
        assert!(NewProduct::new(Some("Hat".to_string()), Some(1.0), Some(-4), None).is_err());
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let patch = ProductPatch::new(None, None, None, None).unwrap();
        assert!(patch.is_empty());

        let mut product = basketball();
        let before = product.clone();
        patch.apply_to(&mut product);
        assert_eq!(product, before);
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let patch = ProductPatch::new(None, Some(10.0), None, Some(CategoryId::new(2))).unwrap();
        let mut product = basketball();
        patch.apply_to(&mut product);

        assert_eq!(product.product_name, "Basketball");
        assert_eq!(product.price, 10.0);
        assert_eq!(product.stock, 3);
        assert_eq!(product.category_id, Some(CategoryId::new(2)));
    }

    #[test]
    fn patch_rejects_blank_name() {
        assert!(ProductPatch::new(Some(" ".to_string()), None, None, None).is_err());
    }

    #[test]
    fn details_serialize_flat_with_relations() {
        let details = ProductDetails {
            product: basketball(),
            category: None,
            tags: vec![Tag {
                id: TagId::new(1),
                tag_name: "sports".to_string(),
            }],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["product_name"], "Basketball");
        assert!(json["category"].is_null());
        assert_eq!(json["tags"][0]["tag_name"], "sports");
    }
}
