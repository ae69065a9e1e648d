//! Mutating item commands. Everything goes through the mutation gateway.

use clap::Args;

use cloudnest_core::error::AppError;
use cloudnest_core::types::ItemId;
use cloudnest_service::DriveContext;

use crate::output::{self, ItemRow, OutputFormat};

/// Arguments for `mkdir`
#[derive(Debug, Args)]
pub struct MkdirArgs {
    /// Folder name
    pub name: String,
    /// Parent folder ID (omit for root)
    #[arg(short, long)]
    pub parent: Option<String>,
}

/// Arguments for `mv`
#[derive(Debug, Args)]
pub struct MvArgs {
    /// Item IDs to move
    #[arg(required = true)]
    pub ids: Vec<String>,
    /// Destination folder ID (omit for root)
    #[arg(short, long)]
    pub to: Option<String>,
    /// Show the valid destinations instead of moving
    #[arg(long)]
    pub targets: bool,
}

/// Arguments for `rename`
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Item ID
    pub id: String,
    /// New name
    pub name: String,
}

/// Item IDs for bulk commands
#[derive(Debug, Args)]
pub struct IdsArgs {
    /// Item IDs
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Arguments for `rm`
#[derive(Debug, Args)]
pub struct RmArgs {
    /// Item IDs
    #[arg(required = true)]
    pub ids: Vec<String>,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for `star`
#[derive(Debug, Args)]
pub struct StarArgs {
    /// Item ID
    pub id: String,
    /// Remove the star instead
    #[arg(long)]
    pub off: bool,
}

/// Arguments for `url`
#[derive(Debug, Args)]
pub struct UrlArgs {
    /// File ID
    pub id: String,
}

/// Create a folder
pub async fn mkdir(args: &MkdirArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let parent = super::parent_arg(args.parent.as_deref(), ctx);
    let (folder, invalidation) = ctx.mutations.create_folder(&args.name, parent.as_ref()).await?;
    match format {
        OutputFormat::Table => {
            output::print_success(&format!("Folder '{}' created (id: {})", folder.name, folder.id));
            output::print_invalidation(&invalidation, format);
        }
        OutputFormat::Json => output::print_item(&folder, format),
    }
    Ok(())
}

/// Move items, or list where they could go
pub async fn mv(args: &MvArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    if args.targets {
        let subjects: Vec<ItemId> = args.ids.iter().map(|id| ItemId::from(id.as_str())).collect();
        let forest = ctx.items.move_targets(&subjects).await?;
        let rows: Vec<ItemRow> = forest
            .iter()
            .flat_map(|root| root.iter())
            .map(|node| ItemRow::from(&node.item))
            .collect();
        output::print_list(&rows, format);
        return Ok(());
    }

    let items = super::fetch_items(&args.ids, ctx).await?;
    let destination = super::parent_arg(args.to.as_deref(), ctx);
    let invalidation = ctx.mutations.move_items(&items, destination.as_ref()).await?;
    output::print_success(&format!(
        "Moved {} item(s) to {}",
        items.len(),
        destination.as_ref().map_or("root".to_string(), ItemId::to_string)
    ));
    output::print_invalidation(&invalidation, format);
    Ok(())
}

/// Rename an item
pub async fn rename(args: &RenameArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let items = super::fetch_items(std::slice::from_ref(&args.id), ctx).await?;
    for item in &items {
        let invalidation = ctx.mutations.rename(item, &args.name).await?;
        output::print_success(&format!("Renamed '{}' to '{}'", item.name, args.name.trim()));
        output::print_invalidation(&invalidation, format);
    }
    Ok(())
}

/// Trash items
pub async fn trash(args: &IdsArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let items = super::fetch_items(&args.ids, ctx).await?;
    let invalidation = match items.as_slice() {
        [single] => ctx.mutations.trash(single).await?,
        many => ctx.mutations.bulk_trash(many).await?,
    };
    output::print_success(&format!("Trashed {} item(s)", items.len()));
    output::print_invalidation(&invalidation, format);
    Ok(())
}

/// Restore trashed items
pub async fn restore(args: &IdsArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let items = super::fetch_items(&args.ids, ctx).await?;
    let invalidation = match items.as_slice() {
        [single] => ctx.mutations.restore(single).await?,
        many => ctx.mutations.bulk_restore(many).await?,
    };
    output::print_success(&format!("Restored {} item(s)", items.len()));
    output::print_invalidation(&invalidation, format);
    Ok(())
}

/// Permanently delete items after confirmation
pub async fn rm(args: &RmArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let items = super::fetch_items(&args.ids, ctx).await?;

    if !args.yes {
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Permanently delete {}? This cannot be undone.",
                names.join(", ")
            ))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let invalidation = ctx.mutations.delete_permanently(&items).await?;
    output::print_success(&format!("Deleted {} item(s)", items.len()));
    output::print_invalidation(&invalidation, format);
    Ok(())
}

/// Star or unstar an item
pub async fn star(args: &StarArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let items = super::fetch_items(std::slice::from_ref(&args.id), ctx).await?;
    for item in &items {
        let invalidation = ctx.mutations.set_starred(item, !args.off).await?;
        let verb = if args.off { "Unstarred" } else { "Starred" };
        output::print_success(&format!("{verb} '{}'", item.name));
        output::print_invalidation(&invalidation, format);
    }
    Ok(())
}

/// Print a download URL
pub async fn url(args: &UrlArgs, ctx: &DriveContext) -> Result<(), AppError> {
    let url = ctx
        .mutations
        .download_url(&ItemId::from(args.id.as_str()))
        .await?;
    println!("{url}");
    Ok(())
}
