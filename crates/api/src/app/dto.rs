use serde::{Deserialize, Serialize};

use storefront_catalog::{NewCategory, NewProduct, NewTag, Product, ProductPatch, ProductTagLink};
use storefront_core::{CategoryId, DomainResult, TagId};

// -------------------------
// Request DTOs
// -------------------------

/// Body of product create and update requests. Every field is optional at the
/// wire level; creation enforces the required ones.
#[derive(Debug, Default, Deserialize)]
pub struct ProductRequest {
    pub product_name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    #[serde(rename = "tagIds")]
    pub tag_ids: Option<Vec<TagId>>,
}

impl ProductRequest {
    pub fn into_new_product(self) -> DomainResult<(NewProduct, Option<Vec<TagId>>)> {
        let new = NewProduct::new(self.product_name, self.price, self.stock, self.category_id)?;
        Ok((new, self.tag_ids))
    }

    pub fn into_patch(self) -> DomainResult<(ProductPatch, Option<Vec<TagId>>)> {
        let patch = ProductPatch::new(self.product_name, self.price, self.stock, self.category_id)?;
        Ok((patch, self.tag_ids))
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category_name: Option<String>,
}

impl CategoryRequest {
    pub fn into_new_category(self) -> DomainResult<NewCategory> {
        NewCategory::new(self.category_name)
    }
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag_name: Option<String>,
}

impl TagRequest {
    pub fn into_new_tag(self) -> DomainResult<NewTag> {
        NewTag::new(self.tag_name)
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Product created together with its initial tag links.
#[derive(Debug, Serialize)]
pub struct ProductWithLinksResponse {
    pub product: Product,
    #[serde(rename = "productTagIdArr")]
    pub links: Vec<ProductTagLink>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn deleted(entity: &str, rows: u64) -> Self {
        Self {
            message: format!("{entity} deleted successfully. {rows} row(s) removed."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_request_reads_camel_case_tag_ids() {
        let req: ProductRequest = serde_json::from_str(
            r#"{"product_name":"Basketball","price":200.0,"stock":3,"tagIds":[1,2,3,4]}"#,
        )
        .unwrap();
        assert_eq!(req.tag_ids.as_ref().map(Vec::len), Some(4));

        let (new, tags) = req.into_new_product().unwrap();
        assert_eq!(new.stock(), 3);
        assert_eq!(tags, Some(vec![TagId::new(1), TagId::new(2), TagId::new(3), TagId::new(4)]));
    }

    #[test]
    fn creation_requires_price() {
        let req = ProductRequest {
            product_name: Some("Cap".into()),
            ..ProductRequest::default()
        };
        assert!(req.into_new_product().is_err());
    }

    #[test]
    fn empty_body_is_an_empty_patch() {
        let req: ProductRequest = serde_json::from_str("{}").unwrap();
        let (patch, tags) = req.into_patch().unwrap();
        assert!(patch.is_empty());
        assert!(tags.is_none());
    }

    #[test]
    fn delete_message_counts_rows() {
        assert_eq!(
            MessageResponse::deleted("Tag", 1).message,
            "Tag deleted successfully. 1 row(s) removed."
        );
    }
}
