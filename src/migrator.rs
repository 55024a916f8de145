use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_wishlists_table::Migration),
            Box::new(m20250301_000002_create_wishlist_items_table::Migration),
        ]
    }
}

mod m20250301_000001_create_wishlists_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_wishlists_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Wishlists::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Wishlists::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Wishlists::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Wishlists::Name).string_len(63).not_null())
                        .col(ColumnDef::new(Wishlists::Description).string_len(255).null())
                        .col(ColumnDef::new(Wishlists::Category).string_len(63).null())
                        .col(
                            ColumnDef::new(Wishlists::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Wishlists::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_wishlists_customer_id")
                        .table(Wishlists::Table)
                        .col(Wishlists::CustomerId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Wishlists::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Wishlists {
        Table,
        Id,
        CustomerId,
        Name,
        Description,
        Category,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_wishlist_items_table {

    use super::m20250301_000001_create_wishlists_table::Wishlists;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_wishlist_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WishlistItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(WishlistItems::WishlistId).uuid().not_null())
                        .col(ColumnDef::new(WishlistItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(WishlistItems::Description)
                                .string_len(255)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WishlistItems::Position)
                                .big_integer()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(WishlistItems::WishlistId)
                                .col(WishlistItems::ProductId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_wishlist_items_wishlist_id")
                                .from(WishlistItems::Table, WishlistItems::WishlistId)
                                .to(Wishlists::Table, Wishlists::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_wishlist_items_wishlist_position")
                        .table(WishlistItems::Table)
                        .col(WishlistItems::WishlistId)
                        .col(WishlistItems::Position)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WishlistItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WishlistItems {
        Table,
        WishlistId,
        ProductId,
        Description,
        Position,
    }
}
