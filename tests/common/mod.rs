#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use uuid::Uuid;
use wishlist_catalog::{
    db::{self, DbConfig},
    entities::{WishlistItemModel, WishlistModel},
    repositories::{NewWishlistItem, WishlistItemRepository},
    services::{
        catalog::{AddItemInput, CreateWishlistInput},
        CatalogService, CustomerContext, PositionEngine,
    },
};

/// Helper harness backed by a fresh in-memory SQLite database.
///
/// The pool holds a single connection, so a test must not use `db` while a
/// transaction it opened is still alive.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub catalog: CatalogService,
    pub engine: PositionEngine,
    pub items: WishlistItemRepository,
    /// Customer owning the wishlists created through the helpers
    pub owner: CustomerContext,
}

impl TestApp {
    /// Construct a new test application with migrated, empty tables.
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::sqlite_in_memory())
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        Self {
            catalog: CatalogService::new(db.clone()),
            engine: PositionEngine::new(),
            items: WishlistItemRepository::new(),
            owner: CustomerContext::new(Uuid::new_v4()),
            db,
        }
    }

    /// A customer other than the owner
    pub fn stranger(&self) -> CustomerContext {
        CustomerContext::new(Uuid::new_v4())
    }

    pub async fn create_wishlist(&self, name: &str) -> WishlistModel {
        self.create_wishlist_with(name, None).await
    }

    pub async fn create_wishlist_with(&self, name: &str, category: Option<&str>) -> WishlistModel {
        self.catalog
            .create_wishlist(
                self.owner,
                CreateWishlistInput {
                    name: name.to_string(),
                    description: None,
                    category: category.map(str::to_string),
                },
            )
            .await
            .expect("failed to create wishlist")
    }

    /// Appends `count` new products through the catalog and returns their ids
    /// in insertion order.
    pub async fn add_products(&self, wishlist_id: Uuid, count: usize) -> Vec<Uuid> {
        let mut products = Vec::with_capacity(count);
        for _ in 0..count {
            let product_id = Uuid::new_v4();
            self.catalog
                .add_item(
                    self.owner,
                    wishlist_id,
                    AddItemInput {
                        product_id,
                        description: None,
                    },
                )
                .await
                .expect("failed to add item");
            products.push(product_id);
        }
        products
    }

    /// Inserts items at explicit positions, bypassing the engine. Returns the
    /// product ids in the order given.
    pub async fn seed_positions(&self, wishlist_id: Uuid, positions: &[i64]) -> Vec<Uuid> {
        let mut products = Vec::with_capacity(positions.len());
        for &position in positions {
            let product_id = Uuid::new_v4();
            self.items
                .create(
                    &*self.db,
                    NewWishlistItem {
                        wishlist_id,
                        product_id,
                        description: None,
                        position,
                    },
                )
                .await
                .expect("failed to seed item");
            products.push(product_id);
        }
        products
    }

    pub async fn ordered_items(&self, wishlist_id: Uuid) -> Vec<WishlistItemModel> {
        self.items
            .find_all_by_wishlist(&*self.db, wishlist_id)
            .await
            .expect("failed to load items")
    }

    pub async fn positions(&self, wishlist_id: Uuid) -> Vec<i64> {
        self.ordered_items(wishlist_id)
            .await
            .into_iter()
            .map(|item| item.position)
            .collect()
    }

    pub async fn product_order(&self, wishlist_id: Uuid) -> Vec<Uuid> {
        self.ordered_items(wishlist_id)
            .await
            .into_iter()
            .map(|item| item.product_id)
            .collect()
    }

    pub async fn position_of(&self, wishlist_id: Uuid, product_id: Uuid) -> i64 {
        self.items
            .find_by_wishlist_and_product(&*self.db, wishlist_id, product_id)
            .await
            .expect("failed to load item")
            .expect("item should exist")
            .position
    }
}

/// Asserts positions are strictly increasing, which also rules out duplicates.
pub fn assert_strictly_increasing(positions: &[i64]) {
    for pair in positions.windows(2) {
        assert!(
            pair[0] < pair[1],
            "positions not strictly increasing: {:?}",
            positions
        );
    }
}
