use std::sync::Arc;

use anyhow::{Context, Result};

pub mod cache;
pub mod cmd;
pub mod http;
pub mod init;
pub mod io;
pub mod start;
pub mod upstream;

pub async fn run() -> Result<()> {
    let shutdown = init::shutdown::init()?;

    let args = init::cmd::init()?;

    let listener = start::bind_listener(args.port)
        .with_context(|| format!("bind listen socket on port {}", args.port))?;
    log::info!("cacheproxy listening on 0.0.0.0:{}", args.port);

    let cache = Arc::new(cache::ObjectCache::new());
    start::serve(listener, cache, &shutdown).await?;
    log::info!("shutdown complete");
    Ok(())
}
