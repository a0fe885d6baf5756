use clap::Parser;

use prodstats_api::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    prodstats_observability::init();
    cli::run(Cli::parse()).await
}
