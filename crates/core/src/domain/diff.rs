use crate::domain::item::{Dataset, Item};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffPolicy {
    /// Every column must match for an item to count as already seen.
    /// A re-priced offering is announced again.
    #[default]
    FullRow,

    /// Only the code+name key must match.
    ByKey,
}

/// Items of `current` not present in `previous`, in `current` order.
pub fn new_items(current: &Dataset, previous: &Dataset, policy: DiffPolicy) -> Vec<Item> {
    match policy {
        DiffPolicy::FullRow => {
            let seen: HashSet<&Item> = previous.items.iter().collect();
            current
                .items
                .iter()
                .filter(|item| !seen.contains(item))
                .cloned()
                .collect()
        }
        DiffPolicy::ByKey => {
            let seen: HashSet<&str> = previous.items.iter().map(Item::key).collect();
            current
                .items
                .iter()
                .filter(|item| !seen.contains(item.key()))
                .cloned()
                .collect()
        }
    }
}
