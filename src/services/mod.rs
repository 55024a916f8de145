// Item ordering inside a wishlist
pub mod positioning;

// Use-cases invoked by the request layer
pub mod catalog;

pub use catalog::{CatalogService, CustomerContext};
pub use positioning::{PositionEngine, PositionError, POSITION_STEP};
