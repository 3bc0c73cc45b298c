//! Catalog store boundary.
//!
//! Every read and write goes through a [`CatalogTx`] opened from a
//! [`CatalogStore`], so multi-step writes (product + link rows) commit or roll
//! back as one unit regardless of the backing engine.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryCatalogStore, InMemoryCatalogTx};
pub use postgres::{PostgresCatalogStore, PostgresCatalogTx};
pub use r#trait::{CatalogStore, CatalogTx, StoreError};
