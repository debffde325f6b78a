//! `vodcache serve` command.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Args;
use vodcache::{ConfigFile, RangeResolver};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind, overriding the configured one
    #[arg(long)]
    bind: Option<SocketAddr>,
}

pub async fn run(args: ServeArgs, config: &ConfigFile) -> Result<(), CliError> {
    let store = super::open_store(config)?;
    let resolver = Arc::new(RangeResolver::new(store));
    let addr = args.bind.unwrap_or(config.server_bind);

    println!(
        "Serving {} at http://{addr}/offline-video/<id>",
        config.store_directory.display()
    );
    vodcache::server::serve(resolver, addr).await?;
    Ok(())
}
