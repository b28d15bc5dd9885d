use clap::Parser;
use receipt_ocr::{config, server, Args};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::try_from(args)?;

    tracing::info!("Starting receipt-ocr v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Preset {} (scale {}x, contrast {}, threshold {}), language {}",
        config.preset.as_str(),
        config.processing.scale_factor,
        config.processing.contrast_coefficient,
        config.processing.binarization_threshold,
        config.language
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
