//! `prodstats` command line: `serve` and `import`.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use prodstats_infra::{
    jobs::{ImportScheduler, ImportTrigger, JobStatus, RetryPolicy, SchedulerConfig},
    ImportStats, Settings,
};

use crate::app::{build_app, build_services};

#[derive(Parser, Debug)]
#[command(name = "prodstats", version, about = "Product statistics service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
#[command(rename_all = "kebab-case")]
pub enum Command {
    /// Run the HTTP API together with the periodic import
    Serve {
        /// Do not start the periodic import
        #[arg(long, default_value_t = false)]
        no_scheduler: bool,
    },
    /// Import products once and print the counters
    Import {
        /// Feed URL, overrides IMPORT_SOURCE_URL
        #[arg(long, value_name = "URL")]
        url: Option<String>,
        /// Retry failed attempts with backoff, like the scheduled import
        #[arg(long, default_value_t = false)]
        with_retry: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Serve { no_scheduler } => serve(settings, !no_scheduler).await,
        Command::Import { url, with_retry } => {
            if let Some(url) = url {
                settings.import.source_url = Some(url);
            }
            let stats = import(&settings, with_retry).await?;
            println!("Import completed: {stats}");
            Ok(())
        }
    }
}

pub async fn serve(settings: Settings, with_scheduler: bool) -> anyhow::Result<()> {
    let services = Arc::new(build_services(&settings).await?);

    let scheduler = with_scheduler.then(|| {
        ImportScheduler::new(
            services.runner.clone(),
            SchedulerConfig::default()
                .with_interval(settings.import.interval)
                .with_run_on_startup(settings.import.run_on_startup),
        )
        .spawn()
    });

    let app = build_app(services);
    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }
    info!("server stopped");
    Ok(())
}

/// Run one import and invalidate the statistic cache on success.
pub async fn import(settings: &Settings, with_retry: bool) -> anyhow::Result<ImportStats> {
    let services = build_services(settings).await?;
    let policy = if with_retry {
        RetryPolicy::import(settings.import.max_retries)
    } else {
        RetryPolicy::no_retry()
    };

    let run = services.import_runner(policy).run(ImportTrigger::Manual).await;
    match run.status {
        JobStatus::Completed => run.stats.context("completed import run without counters"),
        JobStatus::DeadLettered { error, attempts } if attempts > 1 => {
            bail!("{error} (after {attempts} attempts)")
        }
        JobStatus::DeadLettered { error, .. } => bail!(error),
        other => bail!("import run ended in unexpected state {other:?}"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
