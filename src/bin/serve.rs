//! Commerce core server entry point.

use std::sync::Arc;

use commerce_core::payment::UnconfiguredProvider;
use commerce_core::server::{self, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();
    let config = Config::from_env()?;
    // Deployments with a live gateway swap in their provider here; until
    // then payment sync fails cleanly instead of inventing state.
    server::run(config, Arc::new(UnconfiguredProvider)).await
}
