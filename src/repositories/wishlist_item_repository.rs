use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, Unchanged,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::wishlist_item::{self, Column, Entity as WishlistItem};
use crate::entities::{Wishlist, WishlistItemModel};
use crate::errors::ServiceError;

/// Item to be inserted. The position comes from the position engine.
#[derive(Debug, Clone)]
pub struct NewWishlistItem {
    pub wishlist_id: Uuid,
    pub product_id: Uuid,
    pub description: Option<String>,
    pub position: i64,
}

/// Item store: `wishlist_items` rows keyed by `(wishlist_id, product_id)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WishlistItemRepository;

impl WishlistItemRepository {
    pub fn new() -> Self {
        Self
    }

    /// Point lookup by composite identity
    pub async fn find_by_wishlist_and_product<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<WishlistItemModel>, ServiceError> {
        WishlistItem::find_by_id((wishlist_id, product_id))
            .one(db)
            .await
            .map_err(ServiceError::from)
    }

    /// All items of a wishlist in ascending position order
    pub async fn find_all_by_wishlist<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<Vec<WishlistItemModel>, ServiceError> {
        WishlistItem::find()
            .filter(Column::WishlistId.eq(wishlist_id))
            .order_by_asc(Column::Position)
            .order_by_asc(Column::ProductId)
            .all(db)
            .await
            .map_err(ServiceError::from)
    }

    /// Highest position in the wishlist, or 0 when it has no items
    pub async fn find_last_position<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let last = WishlistItem::find()
            .filter(Column::WishlistId.eq(wishlist_id))
            .order_by_desc(Column::Position)
            .one(db)
            .await?;

        Ok(last.map(|item| item.position).unwrap_or(0))
    }

    /// Insert a new item.
    ///
    /// Fails with `ReferentialIntegrity` when the wishlist does not exist and
    /// with `Conflict` when the product is already in the wishlist. Nothing is
    /// written in either case.
    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        item: NewWishlistItem,
    ) -> Result<WishlistItemModel, ServiceError> {
        if Wishlist::find_by_id(item.wishlist_id).one(db).await?.is_none() {
            return Err(ServiceError::ReferentialIntegrity(format!(
                "Wishlist {} does not exist",
                item.wishlist_id
            )));
        }

        if self
            .find_by_wishlist_and_product(db, item.wishlist_id, item.product_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Product {} is already in wishlist {}",
                item.product_id, item.wishlist_id
            )));
        }

        let context = format!(
            "wishlist item ({}, {})",
            item.wishlist_id, item.product_id
        );
        let model = wishlist_item::ActiveModel {
            wishlist_id: Set(item.wishlist_id),
            product_id: Set(item.product_id),
            description: Set(item.description),
            position: Set(item.position),
        };

        let created = model
            .insert(db)
            .await
            .map_err(|e| ServiceError::from_db_constraint(e, context))?;

        debug!(
            wishlist_id = %created.wishlist_id,
            product_id = %created.product_id,
            position = created.position,
            "Created wishlist item"
        );
        Ok(created)
    }

    /// Persist the mutable attributes (description and position) of an item
    pub async fn update<C: ConnectionTrait>(
        &self,
        db: &C,
        item: WishlistItemModel,
    ) -> Result<WishlistItemModel, ServiceError> {
        let (wishlist_id, product_id) = (item.wishlist_id, item.product_id);
        let model = wishlist_item::ActiveModel {
            wishlist_id: Unchanged(item.wishlist_id),
            product_id: Unchanged(item.product_id),
            description: Set(item.description),
            position: Set(item.position),
        };

        model.update(db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => ServiceError::NotFound(format!(
                "Item {} not found in wishlist {}",
                product_id, wishlist_id
            )),
            other => ServiceError::DatabaseError(other),
        })
    }

    /// Change only the description of an existing item
    pub async fn update_description<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
        product_id: Uuid,
        description: Option<String>,
    ) -> Result<WishlistItemModel, ServiceError> {
        let mut item = self
            .find_by_wishlist_and_product(db, wishlist_id, product_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Item {} not found in wishlist {}",
                    product_id, wishlist_id
                ))
            })?;
        item.description = description;
        self.update(db, item).await
    }

    /// Delete one item. Deleting an absent item is a no-op; the return value
    /// tells whether a row was removed.
    pub async fn delete<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let result = WishlistItem::delete_by_id((wishlist_id, product_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Delete every item of a wishlist, returning how many rows went away
    pub async fn delete_all_by_wishlist<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let result = WishlistItem::delete_many()
            .filter(Column::WishlistId.eq(wishlist_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
