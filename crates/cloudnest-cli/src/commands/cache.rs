//! Local item cache commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use cloudnest_cache::keys::{self, TtlCategory};
use cloudnest_core::error::AppError;
use cloudnest_service::DriveContext;

use crate::output::{self, OutputFormat};

/// Arguments for cache commands
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Cache subcommand
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache subcommands
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show cached entries
    Show,
    /// Drop every cached entry
    Clear,
}

/// Cache entry display row
#[derive(Debug, Serialize, Tabled)]
struct EntryRow {
    /// Cache key
    key: String,
    /// Number of items or tree roots
    entries: usize,
    /// TTL bucket
    ttl: String,
    /// When the entry was written
    written_at: String,
}

/// Execute cache commands
pub fn execute(args: &CacheArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        CacheCommand::Show => {
            let rows: Vec<EntryRow> = ctx
                .store
                .keys()
                .into_iter()
                .map(|key| {
                    let ttl = match keys::ttl_category(&key) {
                        TtlCategory::Standard => "standard",
                        TtlCategory::Folder => "folder",
                    };
                    EntryRow {
                        entries: ctx.store.get(&key).map(|v| v.len()).unwrap_or(0),
                        ttl: ttl.to_string(),
                        written_at: ctx
                            .store
                            .written_at(&key)
                            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                            .unwrap_or_default(),
                        key,
                    }
                })
                .collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table {
                output::print_kv("Storage", &ctx.config.cache.storage_path);
            }
        }
        CacheCommand::Clear => {
            let count = ctx.store.len();
            ctx.store.clear();
            output::print_success(&format!("Cleared {count} cached entries"));
        }
    }
    Ok(())
}
