//! # Verify
//!
//! Verify a health card from the command line.
//!
//! ```bash
//! cargo run --example verify -- <numeric-or-compact-card> [issuer-url ...]
//! ```
//!
//! Without issuer URLs, the card is checked against the VCI directory.

use anyhow::{Context as _, Result, anyhow};
use health_card::directory::{Directory, Source};
use health_card::{HttpFetcher, Options, Trust, verify};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("set subscriber");

    let mut args = std::env::args().skip(1);
    let card = args.next().ok_or_else(|| anyhow!("usage: verify <card> [issuer-url ...]"))?;
    let issuers: Vec<String> = args.collect();

    // --------------------------------------------------
    // build the directory
    // --------------------------------------------------
    let source = if issuers.is_empty() { Source::Vci } else { Source::Issuers(issuers) };
    let fetcher = HttpFetcher::new()?;
    let directory = Directory::create(source, &fetcher).await?;
    for entry in directory.log().errors() {
        tracing::warn!("directory: {} ({})", entry.message, entry.code);
    }

    // --------------------------------------------------
    // verify the card
    // --------------------------------------------------
    let verdict = verify(card, Trust::Directory(&directory), Options::default()).await;
    let json = serde_json::to_string_pretty(&verdict).context("serializing verdict")?;
    println!("{json}");

    if !verdict.verified {
        return Err(anyhow!("card did not verify: {}", verdict.reason()));
    }
    Ok(())
}
