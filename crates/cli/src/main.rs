//! Shopstate CLI - Drive a file-backed cart and favorites origin.
//!
//! # Usage
//!
//! ```bash
//! # Add a product to the cart (twice makes quantity 2)
//! shopstate cart add --id A --price 100 --name "Pineapple"
//!
//! # Add an arbitrary product record
//! shopstate cart add --json '{"product_id": "B", "price": 50}'
//!
//! # Change a quantity (values below 1 clamp to 1)
//! shopstate cart qty A 3
//!
//! # Show the cart, or dump its persisted form
//! shopstate cart show
//! shopstate cart show --json
//!
//! # Favorites
//! shopstate favorites add --id X
//! shopstate favorites remove X
//!
//! # Follow changes made by other shopstate processes on the same origin
//! shopstate watch
//! ```
//!
//! # Commands
//!
//! - `cart` - Add, remove, re-quantify, clear or show cart lines
//! - `favorites` - Add, remove, clear or show favorites
//! - `watch` - Stay running and report changes written by other processes

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shopstate_engine::{EngineConfig, FileStorage, ShopState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;

use error::CliError;

#[derive(Parser)]
#[command(name = "shopstate")]
#[command(author, version, about = "Shopstate cart and favorites tools")]
struct Cli {
    /// Storage root directory (overrides `SHOPSTATE_STORAGE_DIR`)
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Origin name (overrides `SHOPSTATE_ORIGIN`)
    #[arg(long, global = true)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Report changes written by other processes until interrupted
    Watch,
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product (an existing line gains one unit)
    Add(ProductArgs),
    /// Remove a line
    Remove {
        /// Canonical product id
        id: String,
    },
    /// Set a line's quantity
    Qty {
        /// Canonical product id
        id: String,
        /// New quantity (values below 1 clamp to 1)
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove every line
    Clear,
    /// Show the cart
    Show(ShowArgs),
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Add a product (already-favorited products are left alone)
    Add(ProductArgs),
    /// Remove a favorite
    Remove {
        /// Canonical product id
        id: String,
    },
    /// Remove every favorite
    Clear,
    /// Show favorites
    Show(ShowArgs),
}

/// Product record assembled from flags.
#[derive(Args)]
pub struct ProductArgs {
    /// Product id
    #[arg(long)]
    pub id: Option<String>,

    /// Unit price
    #[arg(long)]
    pub price: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Extra snapshot field as `key=value` (value parsed as JSON if possible)
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,

    /// Full product record as a JSON object; flags override its fields
    #[arg(long)]
    pub json: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Print the persisted JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopstate_cli=info,shopstate_engine=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Apply `--storage-dir` and `--origin` on top of the environment config.
fn apply_overrides(mut config: EngineConfig, cli: &Cli) -> Result<EngineConfig, CliError> {
    if let Some(dir) = &cli.storage_dir {
        config.storage_dir.clone_from(dir);
    }
    if let Some(origin) = &cli.origin {
        config.origin.clone_from(origin);
    }
    config.origin_dir()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = apply_overrides(EngineConfig::from_env()?, &cli)?;

    let storage = FileStorage::from_config(&config)?;
    let mut state = ShopState::open(storage.clone(), &config)?;

    match cli.command {
        Commands::Cart { action } => {
            let cart = state.cart_mut();
            match action {
                CartAction::Add(product) => commands::collection::add(cart, &product)?,
                CartAction::Remove { id } => commands::collection::remove(cart, &id)?,
                CartAction::Qty { id, quantity } => {
                    commands::collection::update_quantity(cart, &id, quantity)?;
                }
                CartAction::Clear => commands::collection::clear(cart),
                CartAction::Show(args) => commands::collection::show(cart, &args)?,
            }
        }
        Commands::Favorites { action } => {
            let favorites = state.favorites_mut();
            match action {
                FavoritesAction::Add(product) => commands::collection::add(favorites, &product)?,
                FavoritesAction::Remove { id } => commands::collection::remove(favorites, &id)?,
                FavoritesAction::Clear => commands::collection::clear(favorites),
                FavoritesAction::Show(args) => commands::collection::show(favorites, &args)?,
            }
        }
        Commands::Watch => commands::watch::run(state, storage, &config).await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopstate_engine::StorageError;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_overrides_replace_env_values() {
        let cli = parse(&["shopstate", "--storage-dir", "/tmp/s", "--origin", "shop", "watch"]);
        let config = apply_overrides(EngineConfig::default(), &cli).unwrap();
        assert_eq!(config.origin_dir().unwrap(), PathBuf::from("/tmp/s/shop"));
    }

    #[test]
    fn test_origin_flag_is_validated() {
        for origin in ["../escaped", ""] {
            let cli = parse(&["shopstate", "--origin", origin, "cart", "show"]);
            assert!(matches!(
                apply_overrides(EngineConfig::default(), &cli),
                Err(CliError::Storage(StorageError::InvalidOrigin(_)))
            ));
        }
    }

    #[test]
    fn test_io_errors_convert() {
        let error = CliError::from(std::io::Error::other("no signal handler"));
        assert!(matches!(error, CliError::Io(_)));
        assert_eq!(error.to_string(), "I/O error: no signal handler");
    }
}
