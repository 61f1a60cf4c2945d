//! Demo campaign and keyword catalog — the data source behind the optimizer
//! and the place recommendations get applied.

pub mod models;
pub mod store;

pub use store::CatalogStore;
