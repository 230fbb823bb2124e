//! Runs a single fetch-classify cycle and exits.
//! Point an external timer (cron, systemd timer) at this binary for periodic fetching.

use news_sentiment_dashboard::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    news_sentiment_dashboard::init_tracing();

    let config = AppConfig::load_default()?;
    let state = AppState::from_config(config)?;

    let report = state.run_fetch().await?;
    for w in &report.warnings {
        eprintln!("warning: {w}");
    }
    match (report.success_message(), &report.batch_file) {
        (Some(msg), Some(path)) => println!("{msg} -> {}", path.display()),
        _ => println!("nothing written"),
    }
    Ok(())
}
