//! CLI command definitions and dispatch.

pub mod auth;
pub mod browse;
pub mod cache;
pub mod item;
pub mod upload;

use clap::{Parser, Subcommand};

use cloudnest_core::error::AppError;
use cloudnest_core::types::ItemId;
use cloudnest_entity::Item;
use cloudnest_service::DriveContext;

use crate::output::OutputFormat;

/// CloudNest: browse and manage a drive from the terminal
#[derive(Debug, Parser)]
#[command(name = "cloudnest", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and environment overlays
    #[arg(short, long, default_value = "config")]
    pub config_dir: String,

    /// Environment overlay to apply
    #[arg(short, long, env = "CLOUDNEST_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List a folder
    Ls(browse::LsArgs),
    /// Show the folder tree
    Tree(browse::TreeArgs),
    /// Show the breadcrumb path of a folder
    Path(browse::PathArgs),
    /// Search by name
    Search(browse::SearchArgs),
    /// Create a folder
    Mkdir(item::MkdirArgs),
    /// Move items into a folder
    Mv(item::MvArgs),
    /// Rename an item
    Rename(item::RenameArgs),
    /// Move items to the trash
    Trash(item::IdsArgs),
    /// Restore items from the trash
    Restore(item::IdsArgs),
    /// Permanently delete items
    Rm(item::RmArgs),
    /// Star or unstar an item
    Star(item::StarArgs),
    /// Print a download URL
    Url(item::UrlArgs),
    /// Upload files
    Upload(upload::UploadArgs),
    /// Inspect or clear the local item cache
    Cache(cache::CacheArgs),
    /// Manage the stored bearer token
    Auth(auth::AuthArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, ctx: &DriveContext) -> Result<(), AppError> {
        let format = self.format;
        match &self.command {
            Commands::Ls(args) => browse::ls(args, ctx, format).await,
            Commands::Tree(args) => browse::tree(args, ctx).await,
            Commands::Path(args) => browse::path(args, ctx, format).await,
            Commands::Search(args) => browse::search(args, ctx, format).await,
            Commands::Mkdir(args) => item::mkdir(args, ctx, format).await,
            Commands::Mv(args) => item::mv(args, ctx, format).await,
            Commands::Rename(args) => item::rename(args, ctx, format).await,
            Commands::Trash(args) => item::trash(args, ctx, format).await,
            Commands::Restore(args) => item::restore(args, ctx, format).await,
            Commands::Rm(args) => item::rm(args, ctx, format).await,
            Commands::Star(args) => item::star(args, ctx, format).await,
            Commands::Url(args) => item::url(args, ctx).await,
            Commands::Upload(args) => upload::execute(args, ctx, format).await,
            Commands::Cache(args) => cache::execute(args, ctx, format),
            Commands::Auth(args) => auth::execute(args, ctx),
        }
    }
}

/// Helper: turn a `--parent` style argument into a folder id, mapping
/// root sentinels to `None`
pub fn parent_arg(raw: Option<&str>, ctx: &DriveContext) -> Option<ItemId> {
    raw.map(ItemId::from)
        .filter(|id| !id.is_root_sentinel(&ctx.config.tree.root_sentinels))
}

/// Helper: fetch the current server copy of each item
pub async fn fetch_items(ids: &[String], ctx: &DriveContext) -> Result<Vec<Item>, AppError> {
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        items.push(ctx.api.get_item(&ItemId::from(id.as_str())).await?);
    }
    Ok(items)
}
