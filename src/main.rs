use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sutaba::config::{Config, CONSUMER_SECRET_ENV};
use sutaba::error::error_chain;
use sutaba::logging::{self, LoggingConfig};
use sutaba::twitter::crc::crc_response;
use sutaba::twitter_parser::parse_tweet_create_events;
use sutaba::{AccountReport, ReplyDispatcher, ReplyOutcome};
use tokio::io::AsyncReadExt;
use tracing::info;

/// Classify images tweeted at the bot accounts and reply with the result
#[derive(Parser, Debug)]
#[command(name = "sutaba")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (defaults to <config dir>/sutaba/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a webhook CRC challenge
    Crc {
        /// The crc_token query parameter sent by Twitter
        token: String,
    },
    /// Dispatch a tweet_create_events webhook payload
    Handle {
        /// Payload file; read from stdin when omitted
        #[arg(short, long)]
        payload: Option<PathBuf>,
    },
    /// Load and validate the config, then print it with secrets redacted
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crc { token } => {
            logging::init(&LoggingConfig::default())?;
            let secret = consumer_secret(cli.config.as_deref())?;
            println!("{}", serde_json::to_string(&crc_response(&token, &secret)?)?);
        }
        Commands::CheckConfig => {
            let config = Config::load(cli.config.as_deref())?;
            println!("{:#?}", config);
        }
        Commands::Handle { payload } => {
            let config = Config::load(cli.config.as_deref())?;
            logging::init(&config.logging)?;
            handle(&config, payload.as_deref()).await?;
        }
    }

    Ok(())
}

/// The CRC only needs the consumer secret, so the environment is enough.
fn consumer_secret(config_path: Option<&Path>) -> Result<String> {
    if let Ok(secret) = std::env::var(CONSUMER_SECRET_ENV) {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }
    Ok(Config::load(config_path)?.twitter.consumer_secret)
}

async fn read_payload(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read payload {}", path.display())),
        None => {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .context("failed to read payload from stdin")?;
            Ok(body)
        }
    }
}

async fn handle(config: &Config, payload: Option<&Path>) -> Result<()> {
    let body = read_payload(payload).await?;
    let events = parse_tweet_create_events(&body).context("invalid webhook payload")?;
    info!(
        for_user_id = ?events.for_user_id,
        tweets = events.tweets.len(),
        "Handling tweet create events"
    );

    let dispatcher = ReplyDispatcher::from_config(config)?;
    let reports = dispatcher
        .handle_events(&events, &config.bot_accounts())
        .await;

    let mut failed = 0;
    for report in &reports {
        println!("{}", summarize(report));
        if report.result.is_err() {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} account replies failed", failed, reports.len());
    }
    Ok(())
}

fn summarize(report: &AccountReport) -> String {
    let outcome = match &report.result {
        Ok(ReplyOutcome::Posted(posted)) => format!("posted {}", posted.id),
        Ok(ReplyOutcome::Ignored(reason)) => format!("ignored: {}", reason),
        Err(err) => format!("failed ({}): {}", err.stage(), error_chain(err)),
    };
    format!("{}\t@{}\t{}", report.tweet_id, report.screen_name, outcome)
}
