pub mod error;
pub mod listing;
pub mod provider;

pub use error::FetchError;
pub use provider::{DatasetFetcher, HistockFetcher};
