//! EPorner Bot - Entry Point
//!
//! Runs the Telegram bot. Configuration comes from `.env`, an optional TOML
//! file at `EPORNER_CONFIG`, and environment variables.

use eporner_bot::Config;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let json_logs = args.iter().any(|a| a == "--json-logs");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        println!("EPorner Bot v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: eporner-bot [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --json-logs        Log as JSON to stderr");
        println!("  --help, -h         Show this help");
        println!();
        println!("Environment variables:");
        println!("  TELOXIDE_TOKEN          Telegram bot token (or TELEGRAM_BOT_TOKEN)");
        println!("  TELEGRAM_ALLOWED_USERS  Comma-separated user IDs (default: all)");
        println!("  EPORNER_CONFIG          TOML config file");
        println!("  EPORNER_PROXY           HTTP(S) proxy for all requests");
        println!("  EPORNER_BLUR_LEVEL      Thumbnail blur, 0 disables (default: 5)");
        println!("  EPORNER_CACHE_DIR       Thumbnail directory");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("EPorner Bot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    eporner_bot::telegram::run_telegram_bot(config).await
}
