use crate::{
    entities::{WishlistItemModel, WishlistModel},
    errors::ServiceError,
    repositories::{
        NewWishlist, NewWishlistItem, WishlistFilter, WishlistItemRepository, WishlistRepository,
    },
    services::positioning::PositionEngine,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Identity of the caller. Supplied by the request layer on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContext {
    pub customer_id: Uuid,
}

impl CustomerContext {
    pub fn new(customer_id: Uuid) -> Self {
        Self { customer_id }
    }
}

/// Wishlist catalog service.
///
/// The `CatalogService` is the entry point for the request layer:
/// - Wishlist creation, update, search and deletion
/// - Adding, describing and removing wishlist items
/// - Ordering items through the [`PositionEngine`]
///
/// Mutations require the caller to own the wishlist and fail with
/// `ServiceError::Forbidden` otherwise. Reads are open. Every item mutation
/// also stamps the wishlist's `updated_at` in the same transaction.
///
/// # Examples
///
/// ```ignore
/// use wishlist_catalog::services::catalog::{CatalogService, CreateWishlistInput, CustomerContext};
///
/// let catalog = CatalogService::new(db);
/// let ctx = CustomerContext::new(customer_id);
///
/// let wishlist = catalog
///     .create_wishlist(ctx, CreateWishlistInput {
///         name: "Birthday".to_string(),
///         description: None,
///         category: Some("gifts".to_string()),
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    engine: PositionEngine,
    wishlists: WishlistRepository,
    items: WishlistItemRepository,
}

impl CatalogService {
    /// Creates a new `CatalogService` over a connection pool.
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            engine: PositionEngine::new(),
            wishlists: WishlistRepository::new(),
            items: WishlistItemRepository::new(),
        }
    }

    /// Creates a wishlist owned by the caller.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Calling customer, who becomes the owner
    /// * `input` - Name (1 to 63 characters), optional description and category
    ///
    /// # Returns
    ///
    /// * `Ok(WishlistModel)` - The created wishlist with a generated id
    /// * `Err(ServiceError::ValidationError)` - Input failed validation
    /// * `Err(ServiceError)` - Database error
    #[instrument(skip(self))]
    pub async fn create_wishlist(
        &self,
        ctx: CustomerContext,
        input: CreateWishlistInput,
    ) -> Result<WishlistModel, ServiceError> {
        input.validate()?;

        let wishlist = self
            .wishlists
            .create(
                &*self.db,
                NewWishlist {
                    customer_id: ctx.customer_id,
                    name: input.name,
                    description: input.description,
                    category: input.category,
                },
            )
            .await?;

        info!("Created wishlist {} for customer {}", wishlist.id, ctx.customer_id);
        Ok(wishlist)
    }

    /// Retrieves a wishlist with its items in position order.
    ///
    /// # Returns
    ///
    /// * `Ok(WishlistWithItems)` - Wishlist and ordered items
    /// * `Err(ServiceError::NotFound)` - Wishlist not found
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self, wishlist_id: Uuid) -> Result<WishlistWithItems, ServiceError> {
        let wishlist = self.require_wishlist(&*self.db, wishlist_id).await?;
        let items = self.items.find_all_by_wishlist(&*self.db, wishlist_id).await?;
        Ok(WishlistWithItems { wishlist, items })
    }

    /// Replaces name, description and category of a wishlist.
    ///
    /// The owner and creation time are never changed; `updated_at` is set.
    #[instrument(skip(self))]
    pub async fn update_wishlist(
        &self,
        ctx: CustomerContext,
        wishlist_id: Uuid,
        input: UpdateWishlistInput,
    ) -> Result<WishlistModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let mut wishlist = self.owned_wishlist(&txn, ctx, wishlist_id).await?;
        wishlist.name = input.name;
        wishlist.description = input.description;
        wishlist.category = input.category;
        let updated = self.wishlists.update(&txn, wishlist).await?;

        txn.commit().await?;

        info!("Updated wishlist {}", wishlist_id);
        Ok(updated)
    }

    /// Deletes a wishlist and all of its items.
    ///
    /// Deleting a wishlist that does not exist succeeds and returns `false`.
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether a wishlist was removed
    /// * `Err(ServiceError::Forbidden)` - Wishlist belongs to another customer
    /// * `Err(ServiceError)` - Database transaction error
    #[instrument(skip(self))]
    pub async fn delete_wishlist(
        &self,
        ctx: CustomerContext,
        wishlist_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let txn = self.db.begin().await?;

        let Some(wishlist) = self.wishlists.find_by_id_for_update(&txn, wishlist_id).await? else {
            return Ok(false);
        };
        ensure_owner(ctx, &wishlist)?;

        let removed = self.wishlists.delete(&txn, wishlist_id).await?;
        txn.commit().await?;

        Ok(removed)
    }

    /// Searches wishlists. Every supplied filter field must match.
    #[instrument(skip(self))]
    pub async fn search_wishlists(
        &self,
        filter: WishlistFilter,
    ) -> Result<Vec<WishlistModel>, ServiceError> {
        self.wishlists.find(&*self.db, &filter).await
    }

    pub async fn list_wishlists_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<WishlistModel>, ServiceError> {
        self.wishlists
            .find_all_by_customer(&*self.db, customer_id)
            .await
    }

    /// Adds a product to the end of a wishlist.
    ///
    /// The position is assigned by the [`PositionEngine`]; callers cannot
    /// choose it. Use [`move_item`](Self::move_item) afterwards to reorder.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Calling customer, who must own the wishlist
    /// * `wishlist_id` - Target wishlist
    /// * `input` - Product id and optional description (at most 255 characters)
    ///
    /// # Returns
    ///
    /// * `Ok(WishlistItemModel)` - The stored item with its position
    /// * `Err(ServiceError::NotFound)` - Wishlist not found
    /// * `Err(ServiceError::Forbidden)` - Wishlist belongs to another customer
    /// * `Err(ServiceError::Conflict)` - Product already in the wishlist
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let item = catalog
    ///     .add_item(ctx, wishlist_id, AddItemInput {
    ///         product_id,
    ///         description: Some("blue one".to_string()),
    ///     })
    ///     .await?;
    /// assert_eq!(item.position, 1000);
    /// ```
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        ctx: CustomerContext,
        wishlist_id: Uuid,
        input: AddItemInput,
    ) -> Result<WishlistItemModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        self.owned_wishlist(&txn, ctx, wishlist_id).await?;

        let position = self.engine.append_position(&txn, wishlist_id).await?;
        let item = self
            .items
            .create(
                &txn,
                NewWishlistItem {
                    wishlist_id,
                    product_id: input.product_id,
                    description: input.description,
                    position,
                },
            )
            .await?;
        self.wishlists.touch(&txn, wishlist_id).await?;

        txn.commit().await?;

        info!(
            "Added product {} to wishlist {} at position {}",
            item.product_id, wishlist_id, item.position
        );
        Ok(item)
    }

    pub async fn get_item(
        &self,
        wishlist_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistItemModel, ServiceError> {
        self.items
            .find_by_wishlist_and_product(&*self.db, wishlist_id, product_id)
            .await?
            .ok_or_else(|| item_not_found(wishlist_id, product_id))
    }

    /// Lists the items of a wishlist in position order.
    ///
    /// Fails with `NotFound` when the wishlist does not exist, so an empty
    /// result always means an empty wishlist.
    pub async fn list_items(
        &self,
        wishlist_id: Uuid,
    ) -> Result<Vec<WishlistItemModel>, ServiceError> {
        self.require_wishlist(&*self.db, wishlist_id).await?;
        self.items.find_all_by_wishlist(&*self.db, wishlist_id).await
    }

    /// Changes the description of an item. Its position is left alone.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        ctx: CustomerContext,
        wishlist_id: Uuid,
        product_id: Uuid,
        input: UpdateItemInput,
    ) -> Result<WishlistItemModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        self.owned_wishlist(&txn, ctx, wishlist_id).await?;
        let item = self
            .items
            .update_description(&txn, wishlist_id, product_id, input.description)
            .await?;
        self.wishlists.touch(&txn, wishlist_id).await?;

        txn.commit().await?;
        Ok(item)
    }

    /// Moves an item in front of the first other item whose position is at
    /// least `before_position`, or to the end when no such item exists.
    ///
    /// # Returns
    ///
    /// * `Ok(WishlistItemModel)` - The moved item with its new position
    /// * `Err(ServiceError::NotFound)` - Wishlist missing, empty, or without the item
    /// * `Err(ServiceError::Forbidden)` - Wishlist belongs to another customer
    /// * `Err(ServiceError)` - Database transaction error
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Items at 1000 and 2000: move the second one to the front.
    /// let moved = catalog.move_item(ctx, wishlist_id, second, 0).await?;
    /// assert_eq!(moved.position, 500);
    /// ```
    #[instrument(skip(self))]
    pub async fn move_item(
        &self,
        ctx: CustomerContext,
        wishlist_id: Uuid,
        product_id: Uuid,
        before_position: i64,
    ) -> Result<WishlistItemModel, ServiceError> {
        let txn = self.db.begin().await?;

        self.owned_wishlist(&txn, ctx, wishlist_id).await?;
        let item = self
            .engine
            .move_item_in(&txn, wishlist_id, product_id, before_position)
            .await
            .map_err(|e| {
                warn!("Moving product {} in wishlist {} failed: {}", product_id, wishlist_id, e);
                ServiceError::from(e)
            })?;
        self.wishlists.touch(&txn, wishlist_id).await?;

        txn.commit().await?;
        Ok(item)
    }

    /// Removes an item from a wishlist.
    ///
    /// Removing an item that is not there, or from a wishlist that does not
    /// exist, succeeds and returns `false`.
    #[instrument(skip(self))]
    pub async fn delete_item(
        &self,
        ctx: CustomerContext,
        wishlist_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let txn = self.db.begin().await?;

        let Some(wishlist) = self.wishlists.find_by_id_for_update(&txn, wishlist_id).await? else {
            return Ok(false);
        };
        ensure_owner(ctx, &wishlist)?;

        let removed = self.items.delete(&txn, wishlist_id, product_id).await?;
        if removed {
            self.wishlists.touch(&txn, wishlist_id).await?;
        }

        txn.commit().await?;

        if removed {
            info!("Removed product {} from wishlist {}", product_id, wishlist_id);
        }
        Ok(removed)
    }

    /// Restores canonical spacing (1000, 2000, ...) for a wishlist's items.
    #[instrument(skip(self))]
    pub async fn renumber(
        &self,
        ctx: CustomerContext,
        wishlist_id: Uuid,
    ) -> Result<Vec<WishlistItemModel>, ServiceError> {
        let txn = self.db.begin().await?;

        self.owned_wishlist(&txn, ctx, wishlist_id).await?;
        let items = self.engine.renumber_in(&txn, wishlist_id).await?;
        self.wishlists.touch(&txn, wishlist_id).await?;

        txn.commit().await?;
        Ok(items)
    }

    async fn require_wishlist<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<WishlistModel, ServiceError> {
        self.wishlists
            .find_by_id(db, wishlist_id)
            .await?
            .ok_or_else(|| wishlist_not_found(wishlist_id))
    }

    /// Locks the wishlist row and checks the caller owns it
    async fn owned_wishlist<C: ConnectionTrait>(
        &self,
        db: &C,
        ctx: CustomerContext,
        wishlist_id: Uuid,
    ) -> Result<WishlistModel, ServiceError> {
        let wishlist = self
            .wishlists
            .find_by_id_for_update(db, wishlist_id)
            .await?
            .ok_or_else(|| wishlist_not_found(wishlist_id))?;
        ensure_owner(ctx, &wishlist)?;
        Ok(wishlist)
    }
}

fn ensure_owner(ctx: CustomerContext, wishlist: &WishlistModel) -> Result<(), ServiceError> {
    if wishlist.customer_id == ctx.customer_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "Wishlist {} does not belong to customer {}",
            wishlist.id, ctx.customer_id
        )))
    }
}

fn wishlist_not_found(wishlist_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Wishlist {} not found", wishlist_id))
}

fn item_not_found(wishlist_id: Uuid, product_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!(
        "Item {} not found in wishlist {}",
        product_id, wishlist_id
    ))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWishlistInput {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(length(max = 63))]
    pub category: Option<String>,
}

/// Full replacement of the editable wishlist fields
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateWishlistInput {
    #[validate(length(min = 1, max = 63))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(length(max = 63))]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddItemInput {
    pub product_id: Uuid,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistWithItems {
    #[serde(flatten)]
    pub wishlist: WishlistModel,
    pub items: Vec<WishlistItemModel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wishlist_name_bounds_are_enforced() {
        let too_long = CreateWishlistInput {
            name: "x".repeat(64),
            description: None,
            category: None,
        };
        assert!(too_long.validate().is_err());

        let empty = UpdateWishlistInput {
            name: String::new(),
            description: None,
            category: None,
        };
        assert!(empty.validate().is_err());

        let ok = CreateWishlistInput {
            name: "x".repeat(63),
            description: Some("d".repeat(255)),
            category: Some("c".repeat(63)),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn item_description_is_bounded() {
        let input = AddItemInput {
            product_id: Uuid::new_v4(),
            description: Some("d".repeat(256)),
        };
        assert!(input.validate().is_err());
        assert!(UpdateItemInput::default().validate().is_ok());
    }

    #[test]
    fn owner_check_rejects_other_customers() {
        let owner = Uuid::new_v4();
        let wishlist = WishlistModel {
            id: Uuid::new_v4(),
            customer_id: owner,
            name: "Books".into(),
            description: None,
            category: None,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        assert!(ensure_owner(CustomerContext::new(owner), &wishlist).is_ok());
        assert!(matches!(
            ensure_owner(CustomerContext::new(Uuid::new_v4()), &wishlist),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
