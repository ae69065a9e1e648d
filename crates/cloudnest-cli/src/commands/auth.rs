//! Bearer token commands.

use clap::{Args, Subcommand};

use cloudnest_core::error::AppError;
use cloudnest_service::DriveContext;

use crate::output;

/// Arguments for auth commands
#[derive(Debug, Args)]
pub struct AuthArgs {
    /// Auth subcommand
    #[command(subcommand)]
    pub command: AuthCommand,
}

/// Auth subcommands
#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store a bearer token (prompted when omitted)
    SetToken {
        /// The token
        token: Option<String>,
    },
    /// Forget the stored token and the cached listings
    Clear,
    /// Show whether a token is stored
    Status,
}

/// Execute auth commands
pub fn execute(args: &AuthArgs, ctx: &DriveContext) -> Result<(), AppError> {
    match &args.command {
        AuthCommand::SetToken { token } => {
            let token = match token {
                Some(t) => t.clone(),
                None => dialoguer::Password::new()
                    .with_prompt("Bearer token")
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
            };
            if token.trim().is_empty() {
                return Err(AppError::validation("Token must not be empty"));
            }
            ctx.tokens.set(&token)?;
            output::print_success("Token stored");
        }
        AuthCommand::Clear => {
            ctx.tokens.clear()?;
            ctx.store.clear();
            output::print_success("Token and cached listings removed");
        }
        AuthCommand::Status => match ctx.tokens.token()? {
            Some(_) => output::print_kv("Token", "stored"),
            None => output::print_warning("No token stored; run `cloudnest auth set-token`"),
        },
    }
    Ok(())
}
