use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbBackend, DbErr, EntityTrait,
    NotSet,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, Unchanged,
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::wishlist::{self, Column, Entity as Wishlist};
use crate::entities::WishlistModel;
use crate::errors::ServiceError;
use crate::repositories::WishlistItemRepository;

/// Wishlist to be inserted. Id and timestamps are assigned on create.
#[derive(Debug, Clone)]
pub struct NewWishlist {
    pub customer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Search criteria. Every supplied field must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WishlistFilter {
    pub customer_id: Option<Uuid>,
    /// Case-insensitive exact match. SQLite folds ASCII letters only.
    pub category: Option<String>,
    /// Case-insensitive substring match. SQLite folds ASCII letters only.
    pub name: Option<String>,
}

/// Wishlist store
#[derive(Debug, Clone, Copy, Default)]
pub struct WishlistRepository;

impl WishlistRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> Result<Option<WishlistModel>, ServiceError> {
        Wishlist::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::from)
    }

    /// Reads the wishlist row with `SELECT ... FOR UPDATE`.
    ///
    /// Writers that touch a wishlist's item set take this lock first, so they
    /// serialize per wishlist until their transaction ends. SQLite drops the
    /// clause; there the pool holds a single connection (see
    /// [`DbConfig::pool_bounds`](crate::db::DbConfig::pool_bounds)) so
    /// transactions never overlap.
    pub async fn find_by_id_for_update<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> Result<Option<WishlistModel>, ServiceError> {
        Wishlist::find_by_id(id)
            .lock_exclusive()
            .one(db)
            .await
            .map_err(ServiceError::from)
    }

    pub async fn find_all_by_customer<C: ConnectionTrait>(
        &self,
        db: &C,
        customer_id: Uuid,
    ) -> Result<Vec<WishlistModel>, ServiceError> {
        self.find(
            db,
            &WishlistFilter {
                customer_id: Some(customer_id),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_by_category<C: ConnectionTrait>(
        &self,
        db: &C,
        category: &str,
    ) -> Result<Vec<WishlistModel>, ServiceError> {
        self.find(
            db,
            &WishlistFilter {
                category: Some(category.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_by_name_substring<C: ConnectionTrait>(
        &self,
        db: &C,
        name: &str,
    ) -> Result<Vec<WishlistModel>, ServiceError> {
        self.find(
            db,
            &WishlistFilter {
                name: Some(name.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Filtered search ordered by creation time. An empty filter lists every
    /// wishlist.
    pub async fn find<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &WishlistFilter,
    ) -> Result<Vec<WishlistModel>, ServiceError> {
        let backend = db.get_database_backend();
        let mut condition = Condition::all();

        if let Some(customer_id) = filter.customer_id {
            condition = condition.add(Column::CustomerId.eq(customer_id));
        }
        if let Some(category) = &filter.category {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((Wishlist, Column::Category))))
                    .eq(fold_case(backend, category)),
            );
        }
        if let Some(name) = &filter.name {
            let pattern = format!("%{}%", escape_like(&fold_case(backend, name)));
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((Wishlist, Column::Name))))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        Wishlist::find()
            .filter(condition)
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::from)
    }

    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        input: NewWishlist,
    ) -> Result<WishlistModel, ServiceError> {
        let model = wishlist::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(input.customer_id),
            name: Set(input.name),
            description: Set(input.description),
            category: Set(input.category),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(db).await?;
        debug!(wishlist_id = %created.id, customer_id = %created.customer_id, "Created wishlist");
        Ok(created)
    }

    /// Persists name, description and category and stamps `updated_at`.
    /// Owner and creation time are never written.
    pub async fn update<C: ConnectionTrait>(
        &self,
        db: &C,
        wishlist: WishlistModel,
    ) -> Result<WishlistModel, ServiceError> {
        let id = wishlist.id;
        let model = wishlist::ActiveModel {
            id: Unchanged(wishlist.id),
            customer_id: NotSet,
            name: Set(wishlist.name),
            description: Set(wishlist.description),
            category: Set(wishlist.category),
            created_at: NotSet,
            updated_at: Set(Some(Utc::now())),
        };

        model.update(db).await.map_err(|e| not_found_or_store(e, id))
    }

    /// Stamps `updated_at` without changing anything else
    pub async fn touch<C: ConnectionTrait>(&self, db: &C, id: Uuid) -> Result<(), ServiceError> {
        let model = wishlist::ActiveModel {
            id: Unchanged(id),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        model
            .update(db)
            .await
            .map(|_| ())
            .map_err(|e| not_found_or_store(e, id))
    }

    /// Deletes the wishlist and its items in one transaction.
    ///
    /// Items are removed explicitly before the parent row. Deleting an absent
    /// wishlist is a no-op; the return value tells whether a row was removed.
    pub async fn delete<C>(&self, db: &C, id: Uuid) -> Result<bool, ServiceError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;

        let removed_items = WishlistItemRepository::new()
            .delete_all_by_wishlist(&txn, id)
            .await?;
        let result = Wishlist::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!(wishlist_id = %id, removed_items, "Deleted wishlist");
        }
        Ok(removed)
    }
}

fn not_found_or_store(error: DbErr, id: Uuid) -> ServiceError {
    match error {
        DbErr::RecordNotUpdated => ServiceError::NotFound(format!("Wishlist {} not found", id)),
        other => ServiceError::DatabaseError(other),
    }
}

/// Lowercases a search term the same way the backend's `LOWER()` folds the
/// column it is compared with.
///
/// SQLite only folds ASCII letters, so non-ASCII input is left as typed there
/// and matches stored text of the same case only. Postgres folds Unicode.
fn fold_case(backend: DbBackend, input: &str) -> String {
    match backend {
        DbBackend::Sqlite => input.to_ascii_lowercase(),
        _ => input.to_lowercase(),
    }
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("books"), "books");
    }

    #[test]
    fn case_folding_follows_the_backend() {
        assert_eq!(fold_case(DbBackend::Sqlite, "Été BOOKS"), "Été books");
        assert_eq!(fold_case(DbBackend::Postgres, "Été BOOKS"), "été books");
    }
}
