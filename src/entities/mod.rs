pub mod wishlist;
pub mod wishlist_item;

// Re-export entities
pub use wishlist::{Entity as Wishlist, Model as WishlistModel};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
