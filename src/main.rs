use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use wishlist_catalog::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{WishlistItemModel, WishlistModel},
    services::{CatalogService, PositionEngine},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context).await?,
        Commands::Renumber(args) => handle_renumber(&context, args, cli.json).await?,
        Commands::Items(args) => handle_items(&context, args, cli.json).await?,
        Commands::Wishlists(args) => handle_wishlists(&context, args, cli.json).await?,
    }

    db::close_pool(context.db)
        .await
        .context("failed to close database pool")?;
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "wishlist-catalog",
    about = "Maintenance CLI for the wishlist catalog",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Restore canonical item spacing for one wishlist
    Renumber(WishlistArgs),
    /// List the items of a wishlist in position order
    Items(WishlistArgs),
    /// List the wishlists owned by a customer
    Wishlists(CustomerArgs),
}

#[derive(Args)]
struct WishlistArgs {
    #[arg(long, help = "Wishlist identifier")]
    wishlist_id: Uuid,
}

#[derive(Args)]
struct CustomerArgs {
    #[arg(long, help = "Customer identifier")]
    customer_id: Uuid,
}

struct CliContext {
    config: AppConfig,
    db: DbPool,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            config,
            db: db_pool,
        })
    }

    fn catalog(&self) -> CatalogService {
        CatalogService::new(Arc::new(self.db.clone()))
    }

    async fn migrate_if_configured(&self) -> Result<()> {
        if self.config.auto_migrate {
            db::run_migrations(&self.db).await.map_err(|e| {
                error!("Failed running migrations: {}", e);
                e
            })?;
        }
        Ok(())
    }
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied to {}", context.config.environment);
    Ok(())
}

async fn handle_renumber(context: &CliContext, args: WishlistArgs, json: bool) -> Result<()> {
    context.migrate_if_configured().await?;

    let items = PositionEngine::new()
        .renumber(&context.db, args.wishlist_id)
        .await
        .with_context(|| format!("failed to renumber wishlist {}", args.wishlist_id))?;
    info!(wishlist_id = %args.wishlist_id, items = items.len(), "Renumber finished");

    if json {
        print_json(&items)?;
    } else {
        println!(
            "Renumbered {} item(s) in wishlist {}",
            items.len(),
            args.wishlist_id
        );
        items.iter().for_each(render_item);
    }
    Ok(())
}

async fn handle_items(context: &CliContext, args: WishlistArgs, json: bool) -> Result<()> {
    context.migrate_if_configured().await?;

    let items = context
        .catalog()
        .list_items(args.wishlist_id)
        .await
        .with_context(|| format!("failed to list items of wishlist {}", args.wishlist_id))?;

    if json {
        print_json(&items)?;
    } else if items.is_empty() {
        println!("Wishlist {} has no items", args.wishlist_id);
    } else {
        items.iter().for_each(render_item);
    }
    Ok(())
}

async fn handle_wishlists(context: &CliContext, args: CustomerArgs, json: bool) -> Result<()> {
    context.migrate_if_configured().await?;

    let wishlists = context
        .catalog()
        .list_wishlists_for_customer(args.customer_id)
        .await
        .with_context(|| format!("failed to list wishlists of customer {}", args.customer_id))?;

    if json {
        print_json(&wishlists)?;
    } else if wishlists.is_empty() {
        println!("Customer {} has no wishlists", args.customer_id);
    } else {
        wishlists.iter().for_each(render_wishlist);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_item(item: &WishlistItemModel) {
    println!(
        "- {:>8} • product {} • {}",
        item.position,
        item.product_id,
        item.description.as_deref().unwrap_or("-")
    );
}

fn render_wishlist(wishlist: &WishlistModel) {
    println!(
        "- Wishlist {} • {} • category {} • created {}",
        wishlist.id,
        wishlist.name,
        wishlist.category.as_deref().unwrap_or("-"),
        wishlist.created_at.to_rfc3339()
    );
}
