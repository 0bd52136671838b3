use anyhow::Result;
use clap::Parser;

use crate::{cmd::Args, init::logger};

pub fn init() -> Result<Args> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // Propagate argument errors through the fatal startup path; --help
        // and --version print and exit zero.
        Err(err) if err.use_stderr() => return Err(err.into()),
        Err(err) => err.exit(),
    };
    logger::init(&args.log_level, args.colored)?;
    log::debug!("{args:?}");
    Ok(args)
}
