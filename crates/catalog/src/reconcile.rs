//! Product–tag reconciliation.
//!
//! Given the tags a product currently carries and the tags a caller asks for,
//! compute the smallest set of link rows to insert and delete. This is pure
//! set arithmetic; applying the delta (and rolling it back) is the store's job.

use std::collections::HashSet;

use storefront_core::TagId;

/// Minimal change that moves a product's tag set to the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    to_add: HashSet<TagId>,
    to_remove: HashSet<TagId>,
}

impl TagDelta {
    pub fn to_add(&self) -> &HashSet<TagId> {
        &self.to_add
    }

    pub fn to_remove(&self) -> &HashSet<TagId> {
        &self.to_remove
    }

    /// No link writes are needed.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Additions in ascending id order, so inserts are issued deterministically.
    pub fn sorted_additions(&self) -> Vec<TagId> {
        sorted(&self.to_add)
    }

    pub fn sorted_removals(&self) -> Vec<TagId> {
        sorted(&self.to_remove)
    }
}

fn sorted(ids: &HashSet<TagId>) -> Vec<TagId> {
    let mut v: Vec<TagId> = ids.iter().copied().collect();
    v.sort_unstable();
    v
}

/// Compute `to_add = desired - current` and `to_remove = current - desired`.
///
/// An absent or empty `desired` list yields an empty delta: leaving `tagIds`
/// out of a partial update never strips a product's tags. Duplicates in either
/// input count once. Unknown tag ids are passed through; rejecting them is up
/// to the store's foreign keys.
pub fn reconcile<C>(current: C, desired: Option<&[TagId]>) -> TagDelta
where
    C: IntoIterator<Item = TagId>,
{
    let desired: HashSet<TagId> = match desired {
        Some(ids) if !ids.is_empty() => ids.iter().copied().collect(),
        _ => return TagDelta::default(),
    };
    let current: HashSet<TagId> = current.into_iter().collect();

    TagDelta {
        to_add: desired.difference(&current).copied().collect(),
        to_remove: current.difference(&desired).copied().collect(),
    }
}
