//! vidir-serve - REST listing server over in-memory collections
//!
//! Usage:
//!   vidir-serve --config vidir.yaml --seed seed.json --bind 0.0.0.0:3000
//!
//! Without `--config` every preset collection is served. The seed file maps
//! collection names to arrays of JSON objects:
//!
//! ```json
//! { "videos": [{ "id": 1, "title": "Epic Adventure", "created_at": "2024-01-15" }] }
//! ```
//!
//! Log filtering follows `RUST_LOG` (default: `info,vidir=debug`).

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vidir::config::AppConfig;
use vidir::server::ServerBuilder;

#[derive(Parser, Debug)]
#[command(name = "vidir-serve")]
#[command(about = "Serve searchable, paginated content listings over REST")]
#[command(version)]
struct Args {
    /// YAML file declaring the server and collection schemas
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file with initial items per collection
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(long)]
    bind: Option<String>,
}

fn load_seed(path: &Path) -> Result<HashMap<String, Vec<Value>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("seed file {} is not a map of arrays", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,vidir=debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_yaml_file(path)?,
        None => AppConfig::default_config(),
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    let addr = config.bind_addr()?;

    info!(
        "Loaded {} collections: {}",
        config.collections.len(),
        config
            .collections
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut builder = ServerBuilder::new().with_config(&config)?;
    if let Some(path) = &args.seed {
        for (collection, items) in load_seed(path)? {
            let count = items.len();
            builder = builder.seed(&collection, items)?;
            info!(collection = %collection, count, "Seeded collection");
        }
    }

    builder.serve(&addr.to_string()).await
}
