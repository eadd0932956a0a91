use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use gpw::checker::{CheckPolicy, ItemChecker};
use gpw::config::{AppConfig, DEFAULT_CONFIG_FILE};
use gpw::notifiers::{Notifier, PushoverNotifier};
use gpw::preflight::preflight_duration;
use gpw::session::{SeleniumServer, WebDriverSession};

#[derive(Parser, Debug)]
#[command(name = "gpw", about = "Watches product pages for price and availability changes")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print the version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gpw=info".parse()?),
        )
        .init();

    info!("Starting gpw {}", env!("CARGO_PKG_VERSION"));
    let mut config = AppConfig::load(&cli.config)?;
    info!(
        "Watching {} items from {}",
        config.item_count(),
        cli.config.display()
    );

    if let Some(delay) = preflight_duration(
        config.general.preflight_sleep,
        config.general.preflight_sleep_max,
        &mut rand::thread_rng(),
    ) {
        info!("Preflight sleep for {} minutes", delay.as_secs() / 60);
        tokio::time::sleep(delay).await;
    }

    // Credentials are only resolved when notifications are enabled at all.
    let notifier = if config.general.notification_level > 0 {
        Some(PushoverNotifier::from_config(&config.pushover)?)
    } else {
        None
    };

    let server =
        SeleniumServer::launch(&config.selenium, &config.webdriver, config.general.debug).await?;

    let session = match WebDriverSession::connect(server.base_url()).await {
        Ok(session) => session,
        Err(e) => {
            server.stop().await;
            return Err(e.into());
        }
    };

    let policy = CheckPolicy::from_config(&config);
    let outcome = {
        let checker = ItemChecker::new(
            &session,
            notifier.as_ref().map(|n| n as &dyn Notifier),
            policy,
        );
        checker.run(config.items_mut()).await
    };

    // The session and the server are released on every path before the
    // sweep result propagates.
    session.close().await;
    server.stop().await;

    let report = outcome?;
    info!(
        "All items checked: {} checked, {} updated, {} skipped, {} notifications sent",
        report.checked,
        report.updated.len(),
        report.skipped,
        report.notifications_sent
    );
    if !report.updated.is_empty() {
        info!("Updated items: {}", report.updated.join(", "));
    }

    config.save(&cli.config)?;
    info!("Configuration written back to {}", cli.config.display());

    Ok(())
}
