use clap::Parser;
use mimalloc::MiMalloc;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use stock_ticker::StockConnectionManager;
use stock_ticker::cli::{Cli, Command};
use stock_ticker::commands;
use stock_ticker::config::Config;
use stock_ticker::service::connector::redact;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let manager = Arc::new(StockConnectionManager::from_config(
        cfg.database.clone(),
        cfg.credentials.clone(),
    ));

    info!(
        database_url = %redact(&manager.build_authenticated_url()),
        bind = %cfg.server.bind_addr(),
        loglevel = %cfg.loglevel
    );

    let outcome = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => stock_ticker::server::run(&cfg, manager).await,
        Command::CreateTables => commands::create_tables(&manager).await,
        Command::DeleteTables => commands::delete_tables(&manager).await,
        Command::WriteAllTickerValues(args) => {
            commands::write_all_ticker_values(&manager, args.file.as_deref())
                .await
                .map(|summary| {
                    println!(
                        "Wrote {} companies and {} values",
                        summary.companies, summary.values
                    );
                })
        }
    };

    if let Err(e) = outcome {
        error!(error = %e, "command failed");
        return Err(e.into());
    }
    Ok(())
}
