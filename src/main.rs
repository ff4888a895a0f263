//! polydns - query many DNS servers at once
//!
//! Resolves a domain against every configured server concurrently, or
//! against the first one with `--single`, and prints the answers.

use anyhow::{bail, Result};
use clap::Parser;
use polydns::{
    cli::Cli,
    config::Config,
    dns::{DnsClient, QueryContext},
    formatting::formatter_for,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let domain = cli.domain.clone();
    let single = cli.single;
    let deadline = cli.deadline_ms.map(Duration::from_millis);

    let config = Config::load_from_cli(cli).inspect_err(|err| {
        eprintln!("Failed to load configuration: {:#}", err);
    })?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.core.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let record_type = config.record_type()?;
    let client_config = config.client_config()?;

    info!(
        protocol = %client_config.protocol,
        servers = client_config.servers.len(),
        timeout_ms = client_config.timeout.as_millis() as u64,
        retries = client_config.retries,
        proxy = %client_config.proxy.kind,
        output = %config.output.format,
        "polydns starting"
    );

    // =========================================================================
    // Cancellation: Ctrl-C and the optional overall deadline
    // =========================================================================
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut ctx = QueryContext::background().cancelled_by(cancel_rx);
    if let Some(deadline) = deadline {
        ctx = ctx.deadline_at(tokio::time::Instant::now() + deadline);
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling queries");
            cancel_tx.send_replace(true);
        }
    });

    let client = DnsClient::new(client_config);
    let formatter = formatter_for(config.output.format);

    if single {
        let result = client.query(&ctx, &domain, record_type).await?;
        println!("{}", formatter.format_single(&result)?);
        return Ok(());
    }

    let result = client.multi_query(&ctx, &domain, record_type).await?;
    println!("{}", formatter.format_multi(&result)?);

    if result.all_failed() {
        for failure in result.failures() {
            if let Some(err) = &failure.error {
                error!(server = %failure.server, error = %err, "Server failed");
            }
        }
        bail!("all {} servers failed to answer", result.results.len());
    }

    Ok(())
}
