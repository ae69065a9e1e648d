//! File upload command.

use std::path::PathBuf;

use clap::Args;
use tracing::warn;

use cloudnest_core::error::AppError;
use cloudnest_entity::UploadStatus;
use cloudnest_service::DriveContext;

use crate::output::{self, OutputFormat, ResultRow};

/// Arguments for the upload command
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Paths of the files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Target folder ID (omit for root)
    #[arg(short, long)]
    pub parent: Option<String>,

    /// Do not print progress lines
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the upload command
///
/// Files upload concurrently. Ctrl-C cancels every task still running;
/// tasks that already finished keep their result.
pub async fn execute(args: &UploadArgs, ctx: &DriveContext, format: OutputFormat) -> Result<(), AppError> {
    let parent = super::parent_arg(args.parent.as_deref(), ctx);
    let batch = ctx.uploads.submit_paths(&args.files, parent).await;
    for rejected in batch.rejected() {
        output::print_warning(&format!("Skipped {}: {}", rejected.name, rejected.reason));
    }
    if batch.handles().is_empty() {
        return Err(AppError::validation("No file passed validation"));
    }

    let watchers: Vec<_> = if args.quiet {
        Vec::new()
    } else {
        batch
            .handles()
            .iter()
            .map(|handle| {
                let mut progress = handle.subscribe();
                tokio::spawn(async move {
                    let mut last = 0u8;
                    loop {
                        let task = progress.borrow_and_update().clone();
                        if task.progress >= last.saturating_add(10) || task.status.is_terminal() {
                            last = task.progress;
                            println!("  {:<32} {:>3}%  {}", task.name, task.progress, task.status);
                        }
                        if task.status.is_terminal() || progress.changed().await.is_err() {
                            break;
                        }
                    }
                })
            })
            .collect()
    };

    let cancel_all = {
        let ids: Vec<_> = batch.handles().iter().map(|h| h.id()).collect();
        let uploads = std::sync::Arc::clone(&ctx.uploads);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(tasks = ids.len(), "Interrupted, cancelling uploads");
                for id in ids {
                    uploads.cancel(id);
                }
            }
        })
    };

    let outcome = ctx.mutations.finish_upload(batch).await;
    cancel_all.abort();
    futures::future::join_all(watchers).await;

    let rows: Vec<ResultRow> = outcome.results.iter().map(ResultRow::from).collect();
    output::print_list(&rows, format);

    let completed = outcome
        .results
        .iter()
        .filter(|r| r.status == UploadStatus::Completed)
        .count();
    let failed = outcome
        .results
        .iter()
        .filter(|r| r.status == UploadStatus::Error)
        .count();
    if failed > 0 {
        output::print_error(&format!(
            "{failed} upload(s) failed; retry them with the same command"
        ));
    }
    output::print_success(&format!("{completed} of {} file(s) uploaded", outcome.results.len()));
    Ok(())
}
