mod cache;
mod catalog;
mod error;
mod http;
mod nav;
mod places;
mod state;

use tracing::info;

use nav::Navigator;
use state::{AppConfig, AppState};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();
    let config = AppConfig::from_env()?;

    // Logs go to stderr; stdout carries the prompt protocol
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let app = AppState::new(&config)?;
    info!(cache_dir = ?app.cache.dir(), base_url = %config.base_url, "NPS explorer initialized");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let mut navigator = Navigator::new(&app.catalog, &app.places);
    navigator.run(stdin, &mut stdout).await
}
