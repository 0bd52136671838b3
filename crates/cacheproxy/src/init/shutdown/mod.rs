use std::sync::Arc;

use anyhow::Result;
use mea::latch::Latch;

mod ctrlc;

pub fn init() -> Result<GracefulShutdown> {
    let ctrlc = ctrlc::init()?;
    let shutdown = GracefulShutdown::new();
    let signal = shutdown.clone();
    smol::spawn(async move {
        let _ = ctrlc.await;
        log::info!("shutdown requested, draining in-flight requests");
        signal.initiate();
    })
    .detach();
    Ok(shutdown)
}

/// One-shot stop signal shared between the signal handler and the accept
/// loop.
#[derive(Clone)]
pub struct GracefulShutdown {
    stop: Arc<Latch>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(Latch::new(1)),
        }
    }

    pub fn initiate(&self) {
        self.stop.count_down();
    }

    pub async fn wait_shutting_down(&self) {
        self.stop.wait().await;
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
