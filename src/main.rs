//! marreta 命令行：分析单个URL并输出处理后的HTML

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use marreta::{DenyLists, GlobalConfig, JsonRuleProvider, UrlAnalyzer};

#[derive(Parser)]
#[command(name = "marreta", version, about = "Fetch a paywalled article and print the cleaned HTML")]
struct Cli {
    /// URL to analyze
    url: String,

    /// Domain rule table (JSON)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Blocked / DMCA / restricted keyword lists (JSON)
    #[arg(long)]
    deny_lists: Option<PathBuf>,

    /// Cache raw HTML on disk instead of in memory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Inject the activated-rules panel and enable debug logging
    #[arg(long, short)]
    debug: bool,

    /// Only probe the URL status
    #[arg(long)]
    status: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "marreta=debug" } else { "marreta=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = GlobalConfig::from_env().context("Failed to load configuration")?;
    config.debug |= cli.debug;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }

    let mut builder = UrlAnalyzer::builder(config);
    if let Some(path) = &cli.rules {
        let rules = JsonRuleProvider::from_file(path)
            .await
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        builder = builder.rules(Arc::new(rules));
    }
    if let Some(path) = &cli.deny_lists {
        let lists = DenyLists::from_file(path)
            .await
            .with_context(|| format!("Failed to load deny lists from {}", path.display()))?;
        builder = builder.deny_lists(lists);
    }
    let analyzer = builder.build().await.context("Failed to build analyzer")?;

    if cli.status {
        let status = analyzer.check_status(&cli.url).await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match analyzer.analyze(&cli.url).await {
        Ok(outcome) if cli.json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        Ok(outcome) => {
            tracing::debug!("activated rules: {}", outcome.activated_rules);
            println!("{}", outcome.content);
        }
        Err(e) => {
            tracing::error!(kind = %e.kind, status = e.status, "{}", e.message);
            anyhow::bail!("{} ({})", e.message, e.status);
        }
    }

    Ok(())
}
