//! Explicit store interfaces over the wishlist tables.
//!
//! Repositories are stateless: every operation takes the connection it runs
//! on, which is either the pool or an open `DatabaseTransaction`. That lets
//! the position engine and the catalog service compose several store calls
//! inside one transaction.

pub mod wishlist_item_repository;
pub mod wishlist_repository;

pub use wishlist_item_repository::{NewWishlistItem, WishlistItemRepository};
pub use wishlist_repository::{NewWishlist, WishlistFilter, WishlistRepository};
