//! Read-only commands: listing, tree, breadcrumb and search.

use clap::{Args, ValueEnum};

use cloudnest_core::error::AppError;
use cloudnest_core::types::ItemId;
use cloudnest_entity::ItemKind;
use cloudnest_service::search::IndexOutcome;
use cloudnest_service::{DriveContext, ListOptions};

use crate::output::{self, ItemRow, OutputFormat, SearchRow};

/// Kind filter for `ls`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    /// Folders only
    Folders,
    /// Files only
    Files,
}

impl From<KindFilter> for ItemKind {
    fn from(filter: KindFilter) -> Self {
        match filter {
            KindFilter::Folders => ItemKind::Folder,
            KindFilter::Files => ItemKind::File,
        }
    }
}

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder ID (omit for root)
    pub parent: Option<String>,
    /// Only folders or only files
    #[arg(short, long, value_enum)]
    pub kind: Option<KindFilter>,
    /// Bypass the local cache
    #[arg(short, long)]
    pub refresh: bool,
}

/// Arguments for `tree`
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Max depth
    #[arg(short, long, default_value = "8")]
    pub depth: usize,
    /// Bypass the local cache
    #[arg(short, long)]
    pub refresh: bool,
}

/// Arguments for `path`
#[derive(Debug, Args)]
pub struct PathArgs {
    /// Folder ID
    pub folder: String,
}

/// Arguments for `search`
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Text to look for in item names
    pub query: String,
    /// Ask the backend instead of walking every folder locally
    #[arg(long)]
    pub remote: bool,
    /// Rebuild the local index from fresh listings
    #[arg(short, long)]
    pub refresh: bool,
}

/// List one folder
pub async fn ls(args: &LsArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let parent = super::parent_arg(args.parent.as_deref(), ctx);
    let options = ListOptions {
        force_refresh: args.refresh,
        kind: args.kind.map(ItemKind::from),
    };
    let items = ctx.items.list(parent.as_ref(), &options).await?;
    let rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
    output::print_list(&rows, format);
    Ok(())
}

/// Print the whole folder tree
pub async fn tree(args: &TreeArgs, ctx: &DriveContext) -> Result<(), AppError> {
    let folders = ctx.items.folder_tree(args.refresh).await?;
    let forest = ctx.items.tree_builder().build_forest(&folders);
    output::print_tree(&forest, args.depth);
    Ok(())
}

/// Print the breadcrumb of a folder
pub async fn path(args: &PathArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let trail = ctx.items.breadcrumb(&ItemId::from(args.folder.as_str())).await?;
    match format {
        OutputFormat::Table => {
            let names: Vec<&str> = trail.iter().map(|s| s.name.as_str()).collect();
            println!("/{}", names.join(" / "));
        }
        OutputFormat::Json => output::print_item(&trail, format),
    }
    Ok(())
}

/// Search item names
pub async fn search(args: &SearchArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    if args.remote {
        let items = ctx.items.search_remote(&args.query, args.refresh).await?;
        let rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
        output::print_list(&rows, format);
        return Ok(());
    }

    if let IndexOutcome::Completed { failed, .. } = ctx.indexer.index_all(args.refresh).await {
        if failed > 0 {
            output::print_warning(&format!("{failed} folder(s) could not be read; results may be incomplete"));
        }
    }
    let hits = ctx.indexer.search(&args.query);
    let rows: Vec<SearchRow> = hits.iter().map(SearchRow::from).collect();
    output::print_list(&rows, format);
    Ok(())
}
