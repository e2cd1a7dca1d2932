/// Kindred - personal relationship tracker
///
/// Serves the HTTP API and runs the reminder and digest jobs.
use kindred::{config::ServerConfig, jobs, server, AppContext, KindredResult};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> KindredResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kindred=debug,tower_http=debug".into());
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    __ __ _           __              __
   / //_/(_)___  ____/ /_______  ____/ /
  / ,<  / / __ \/ __  / ___/ _ \/ __  /
 / /| |/ / / / / /_/ / /  /  __/ /_/ /
/_/ |_/_/_/ /_/\__,_/_/   \___/\__,_/

        Personal relationship tracker v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
