use anyhow::{Context, Result};

pub fn init() -> Result<ctrlc2::AsyncCtrlC> {
    ctrlc2::AsyncCtrlC::new(|| true).context("install Ctrl-C handler")
}
