use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product reference inside a wishlist.
///
/// Identity is the `(wishlist_id, product_id)` pair, so a product appears at
/// most once per wishlist. `position` is the sort key maintained by
/// [`crate::services::positioning::PositionEngine`]; callers never pick it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wishlist_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub wishlist_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub product_id: Uuid,

    pub description: Option<String>,
    pub position: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wishlist::Entity",
        from = "Column::WishlistId",
        to = "super::wishlist::Column::Id",
        on_delete = "Cascade"
    )]
    Wishlist,
}

impl Related<super::wishlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wishlist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
