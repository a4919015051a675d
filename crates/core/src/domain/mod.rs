pub mod diff;
pub mod filter;
pub mod item;

pub use diff::DiffPolicy;
pub use filter::FilterCriteria;
pub use item::{Dataset, Item, Snapshot};
