//! Catalog domain module.
//!
//! Categories, products, tags and the product–tag link, plus the pure tag
//! reconciliation used on product writes. No IO, no HTTP, no storage.

pub mod category;
pub mod link;
pub mod product;
pub mod reconcile;
pub mod tag;
mod validation;

pub use category::{Category, CategoryDetails, NewCategory};
pub use link::ProductTagLink;
pub use product::{
    DEFAULT_STOCK, NewProduct, Product, ProductDetails, ProductPatch, ProductSummary,
};
pub use reconcile::{TagDelta, reconcile};
pub use tag::{NewTag, Tag, TagDetails};
