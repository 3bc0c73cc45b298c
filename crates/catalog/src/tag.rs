use serde::{Deserialize, Serialize};

use storefront_core::{DomainResult, Entity, TagId};

use crate::product::ProductSummary;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub tag_name: String,
}

impl Entity for Tag {
    type Id = TagId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Validated input for creating or renaming a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    tag_name: String,
}

impl NewTag {
    pub fn new(tag_name: Option<String>) -> DomainResult<Self> {
        let tag_name = validation::required_name("tag name", tag_name)?;
        Ok(Self { tag_name })
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }
}

/// A tag together with the products linked to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDetails {
    #[serde(flatten)]
    pub tag: Tag,
    pub products: Vec<ProductSummary>,
}
