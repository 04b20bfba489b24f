//! Auth command - authentication management.

use anyhow::{Context as _, Result};
use boardbridge_config::BridgeConfig;
use boardbridge_oauth::{DEFAULT_EXPIRY_SKEW, FileTokenStore, TokenInfo, TokenStore};
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Authorize boardbridge with Miro in the browser
    Login {
        /// Re-authorize even when a valid token is stored
        #[arg(long)]
        force: bool,
    },

    /// Show authentication status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clear stored OAuth tokens
    Logout,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login { force } => cmd_login(force, ctx).await,
        AuthCommand::Status { json } => cmd_status(json).await,
        AuthCommand::Logout => cmd_logout().await,
    }
}

async fn cmd_login(force: bool, ctx: &Context) -> Result<()> {
    let config = BridgeConfig::load()?;
    let auth = super::authenticator(&config)?;

    if !force
        && let Ok(Some(info)) = auth.token_info().await
        && !info.is_expired
    {
        println!(
            "Already authenticated (expires in {})",
            info.expires_in_display()
        );
        println!("Run 'boardbridge auth login --force' to re-authorize.");
        return Ok(());
    }

    println!("Miro OAuth Authorization");
    println!("========================");
    println!();
    println!("Your browser will open the Miro consent page.");
    println!(
        "Waiting up to {}s for the redirect to {}",
        config.oauth.callback_timeout_secs, config.oauth.redirect_uri
    );
    if ctx.verbose {
        println!("Tokens will be stored in {}", config.token_path().display());
    }
    println!();

    let result = if force {
        auth.login().await
    } else {
        auth.access_token().await
    };
    result.context("Authorization failed")?;

    println!("Authentication successful!");
    if let Ok(Some(info)) = auth.token_info().await {
        println!("Token expires in {}", info.expires_in_display());
    }
    Ok(())
}

async fn cmd_status(json: bool) -> Result<()> {
    let config = BridgeConfig::load_without_credentials()?;
    let store = FileTokenStore::new(config.token_path());
    let tokens = store.load().await.context("Failed to read stored tokens")?;

    let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let skew_ms = DEFAULT_EXPIRY_SKEW.as_millis() as u64;
    let info = tokens
        .as_ref()
        .map(|tokens| TokenInfo::from_tokens(tokens, now_ms, skew_ms));

    if json {
        let status = serde_json::json!({
            "authenticated": info.as_ref().is_some_and(|i| !i.is_expired || i.has_refresh_token),
            "client_id_configured": config.oauth.client_id.is_some(),
            "token": info,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Authentication Status");
    println!("=====================");
    println!();
    println!(
        "Client ID:  {}",
        if config.oauth.client_id.is_some() {
            "configured"
        } else {
            "not configured (set MIRO_CLIENT_ID)"
        }
    );

    match info {
        Some(info) => {
            println!("OAuth:      authenticated");
            println!("Expires:    {}", info.expires_in_display());
            println!(
                "Refresh:    {}",
                if info.has_refresh_token {
                    "available"
                } else {
                    "none"
                }
            );
            if let Some(scope) = &info.scope {
                println!("Scope:      {scope}");
            }
        }
        None => {
            println!("OAuth:      not authenticated");
            println!();
            println!("Run 'boardbridge auth login' to authorize.");
        }
    }
    Ok(())
}

async fn cmd_logout() -> Result<()> {
    let config = BridgeConfig::load_without_credentials()?;
    let store = FileTokenStore::new(config.token_path());
    let had_tokens = config.token_path().exists();

    store.delete().await.context("Failed to remove stored tokens")?;

    if had_tokens {
        println!("OAuth tokens removed.");
    } else {
        println!("No OAuth tokens found.");
    }
    Ok(())
}
