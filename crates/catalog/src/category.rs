use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainResult, Entity};

use crate::product::ProductSummary;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub category_name: String,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Validated input for creating or renaming a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    category_name: String,
}

impl NewCategory {
    pub fn new(category_name: Option<String>) -> DomainResult<Self> {
        let category_name = validation::required_name("category name", category_name)?;
        Ok(Self { category_name })
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }
}

/// A category together with the products filed under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDetails {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<ProductSummary>,
}
