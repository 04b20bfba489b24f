//! Rate-limit command - inspect or reset the persisted buckets.

use anyhow::{Context as _, Result};
use boardbridge_client::rate_limit::BucketStatus;
use boardbridge_config::BridgeConfig;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the rate-limit command.
#[derive(Args, Debug)]
pub struct RateLimitArgs {
    #[command(subcommand)]
    pub command: RateLimitCommand,
}

#[derive(Subcommand, Debug)]
pub enum RateLimitCommand {
    /// Show remaining capacity in both buckets
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refill both buckets and delete the persisted state
    Reset,
}

/// Run the rate-limit command.
pub async fn run(args: RateLimitArgs, ctx: &Context) -> Result<()> {
    let config = BridgeConfig::load_without_credentials()?;
    let limiter = super::rate_limiter(&config);

    match args.command {
        RateLimitCommand::Status { json } => {
            let status = limiter.get_rate_limit_status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            println!("Rate Limit Status");
            println!("=================");
            println!();
            print_bucket("Per-user", &status.user);
            print_bucket("Per-app", &status.app);
            if ctx.verbose {
                println!();
                println!("State file: {}", config.rate_limit_path().display());
            }
        }
        RateLimitCommand::Reset => {
            limiter
                .reset()
                .await
                .context("Failed to reset rate-limit state")?;
            println!("Rate-limit state reset.");
        }
    }
    Ok(())
}

fn print_bucket(label: &str, bucket: &BucketStatus) {
    let next = if bucket.next_refill_ms == 0 {
        "full".to_string()
    } else {
        format!("next token in {}ms", bucket.next_refill_ms)
    };
    println!(
        "{label:<10} {:>8.2} / {:<6} ({}/s, {next})",
        bucket.remaining, bucket.capacity, bucket.refill_rate
    );
}
