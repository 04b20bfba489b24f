//! Serve command - the MCP tool server on stdio.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use boardbridge_config::BridgeConfig;
use boardbridge_mcp::{McpServer, catalogue};
use clap::Args;

use super::Context;

/// Arguments for the serve command.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Authorize before accepting requests instead of on the first tool call
    #[arg(long)]
    pub login: bool,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let config = BridgeConfig::load().context("Cannot start the MCP server")?;
    let auth = Arc::new(super::authenticator(&config)?);

    if args.login {
        auth.access_token()
            .await
            .context("Authorization with Miro failed")?;
    }

    let client = super::board_client(&config, auth)?;
    let registry = catalogue(&client);

    tracing::info!(
        tools = registry.len(),
        api = %client.base_url(),
        data_dir = %config.data_dir.display(),
        verbose = ctx.verbose,
        "Starting MCP server on stdio"
    );

    McpServer::new(registry)
        .with_server_info("boardbridge", env!("CARGO_PKG_VERSION"))
        .serve_stdio()
        .await
        .context("MCP server failed")?;

    tracing::info!("MCP server stopped");
    Ok(())
}
