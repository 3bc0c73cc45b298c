use serde::{Deserialize, Serialize};

use storefront_core::{Entity, ProductId, ProductTagId, TagId};

/// One edge of the product–tag relation.
///
/// Link rows are never updated in place: a changed association is a delete
/// followed by an insert.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTagLink {
    pub id: ProductTagId,
    pub product_id: ProductId,
    pub tag_id: TagId,
}

impl Entity for ProductTagLink {
    type Id = ProductTagId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
