//! Ordering of items inside a wishlist.
//!
//! Every item carries an integer `position`. The resting layout for `n` items
//! is `1000, 2000, ..., n * 1000`. Appends take `last + 1000`, moves take the
//! integer midpoint between the new neighbours, and when two neighbours are
//! too close for a midpoint the whole wishlist is renumbered back to the
//! resting layout before the move is retried once.

use metrics::counter;
use sea_orm::{ConnectionTrait, DbErr, TransactionTrait};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entities::WishlistItemModel;
use crate::errors::ServiceError;
use crate::repositories::{WishlistItemRepository, WishlistRepository};

/// Gap between neighbouring items after a renumber, and the distance an
/// appended item is placed after the current last one.
pub const POSITION_STEP: i64 = 1000;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Wishlist {0} not found")]
    WishlistNotFound(Uuid),

    #[error("Wishlist {0} has no items")]
    EmptyWishlist(Uuid),

    #[error("Item with product_id {product_id} not found in wishlist {wishlist_id}")]
    ItemNotFound { wishlist_id: Uuid, product_id: Uuid },

    #[error("No free position left in wishlist {0} after renumbering")]
    GapExhausted(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Store(#[from] ServiceError),
}

impl From<PositionError> for ServiceError {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::WishlistNotFound(_)
            | PositionError::EmptyWishlist(_)
            | PositionError::ItemNotFound { .. } => ServiceError::NotFound(err.to_string()),
            PositionError::GapExhausted(_) => ServiceError::InternalError(err.to_string()),
            PositionError::Database(e) => ServiceError::DatabaseError(e),
            PositionError::Store(e) => e,
        }
    }
}

/// Canonical position of the item at `index` in a renumbered wishlist
pub fn canonical_position(index: usize) -> i64 {
    (index as i64 + 1) * POSITION_STEP
}

/// Outcome of planning a move against a snapshot of the item set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePlan {
    /// The mover can take this position directly.
    Place(i64),
    /// No integer fits in front of `before`; a renumber is needed first.
    Exhausted { before: Uuid },
}

/// Plans moving `mover` in front of the first other item whose position is
/// at least `before_position`.
///
/// `items` must be ordered by position. The anchor and its predecessor are
/// looked up among the items other than the mover, so the mover's current
/// slot never counts as a neighbour. Returns `None` when the mover is not in
/// `items`.
pub fn plan_move(
    items: &[WishlistItemModel],
    mover: Uuid,
    before_position: i64,
) -> Option<MovePlan> {
    let last = items.last()?;
    if !items.iter().any(|item| item.product_id == mover) {
        return None;
    }

    let others: Vec<&WishlistItemModel> =
        items.iter().filter(|item| item.product_id != mover).collect();

    let Some(before_index) = others
        .iter()
        .position(|item| item.position >= before_position)
    else {
        return Some(MovePlan::Place(last.position + POSITION_STEP));
    };

    let before = others[before_index];
    let previous = before_index.checked_sub(1).map(|i| others[i].position);
    let candidate = match previous {
        None => before.position.div_euclid(2),
        Some(prev) => (before.position + prev).div_euclid(2),
    };

    let exhausted = candidate <= 0
        || candidate == before.position
        || previous.is_some_and(|prev| candidate == prev);

    Some(if exhausted {
        MovePlan::Exhausted {
            before: before.product_id,
        }
    } else {
        MovePlan::Place(candidate)
    })
}

/// Assigns and maintains item positions.
///
/// The engine holds no state of its own. Every operation either opens its own
/// transaction or, in the `*_in` variants, runs inside one owned by the
/// caller. Writers lock the wishlist row before reading the item set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionEngine {
    wishlists: WishlistRepository,
    items: WishlistItemRepository,
}

impl PositionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position for an item appended to the end of the wishlist.
    pub async fn append_position<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<i64, PositionError> {
        let last = self.items.find_last_position(db, wishlist_id).await?;
        Ok(last + POSITION_STEP)
    }

    /// Rewrites every position of the wishlist to canonical spacing, all or
    /// nothing.
    #[instrument(skip(self, db))]
    pub async fn renumber<C: TransactionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<Vec<WishlistItemModel>, PositionError> {
        let txn = db.begin().await?;
        let items = self.renumber_in(&txn, wishlist_id).await?;
        txn.commit().await?;
        Ok(items)
    }

    /// [`renumber`](Self::renumber) inside a caller-owned transaction
    pub async fn renumber_in<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<Vec<WishlistItemModel>, PositionError> {
        self.lock_wishlist(db, wishlist_id).await?;
        let items = self.items.find_all_by_wishlist(db, wishlist_id).await?;
        self.rewrite_canonical(db, wishlist_id, items).await
    }

    /// Moves an item in front of the first other item positioned at or after
    /// `before_position`, or to the end when there is none.
    #[instrument(skip(self, db))]
    pub async fn move_item<C: TransactionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
        product_id: Uuid,
        before_position: i64,
    ) -> Result<WishlistItemModel, PositionError> {
        let txn = db.begin().await?;
        let item = self
            .move_item_in(&txn, wishlist_id, product_id, before_position)
            .await?;
        txn.commit().await?;
        Ok(item)
    }

    /// [`move_item`](Self::move_item) inside a caller-owned transaction.
    ///
    /// When the target gap is exhausted the wishlist is renumbered in the same
    /// transaction and the move retried against the anchor's new position.
    /// That happens at most once.
    pub async fn move_item_in<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
        product_id: Uuid,
        before_position: i64,
    ) -> Result<WishlistItemModel, PositionError> {
        self.lock_wishlist(db, wishlist_id).await?;

        let mut anchor = before_position;
        let mut renumbered = false;

        loop {
            let items = self.items.find_all_by_wishlist(db, wishlist_id).await?;
            let not_found = || PositionError::ItemNotFound {
                wishlist_id,
                product_id,
            };

            match items.len() {
                0 => return Err(PositionError::EmptyWishlist(wishlist_id)),
                // Nothing to reorder against.
                1 => return items.into_iter().next().ok_or_else(not_found),
                _ => {}
            }

            match plan_move(&items, product_id, anchor).ok_or_else(not_found)? {
                MovePlan::Place(position) => {
                    let mut mover = items
                        .into_iter()
                        .find(|item| item.product_id == product_id)
                        .ok_or_else(not_found)?;
                    let from = mover.position;
                    mover.position = position;
                    let moved = self.items.update(db, mover).await?;

                    counter!("wishlist_positions.moved", 1);
                    debug!(%wishlist_id, %product_id, from, to = position, "Moved wishlist item");
                    return Ok(moved);
                }
                MovePlan::Exhausted { before } => {
                    if renumbered {
                        warn!(%wishlist_id, %product_id, anchor, "Position gap still exhausted after renumber");
                        return Err(PositionError::GapExhausted(wishlist_id));
                    }

                    info!(%wishlist_id, %product_id, anchor, "Position gap exhausted, renumbering");
                    self.rewrite_canonical(db, wishlist_id, items).await?;
                    renumbered = true;

                    anchor = self
                        .items
                        .find_by_wishlist_and_product(db, wishlist_id, before)
                        .await?
                        .map(|item| item.position)
                        .ok_or(PositionError::ItemNotFound {
                            wishlist_id,
                            product_id: before,
                        })?;
                }
            }
        }
    }

    async fn lock_wishlist<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
    ) -> Result<(), PositionError> {
        self.wishlists
            .find_by_id_for_update(db, wishlist_id)
            .await?
            .map(|_| ())
            .ok_or(PositionError::WishlistNotFound(wishlist_id))
    }

    async fn rewrite_canonical<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist_id: Uuid,
        items: Vec<WishlistItemModel>,
    ) -> Result<Vec<WishlistItemModel>, PositionError> {
        let mut renumbered = Vec::with_capacity(items.len());
        let mut changed = 0usize;

        for (index, mut item) in items.into_iter().enumerate() {
            let target = canonical_position(index);
            if item.position != target {
                item.position = target;
                item = self.items.update(db, item).await?;
                changed += 1;
            }
            renumbered.push(item);
        }

        counter!("wishlist_positions.renumbered", 1);
        info!(%wishlist_id, items = renumbered.len(), changed, "Renumbered wishlist");
        Ok(renumbered)
    }
}
