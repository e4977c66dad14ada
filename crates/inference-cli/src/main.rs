//! Paddle Inference - Command Line Entry Point

use clap::Parser;
use inference_cli::{build_predictor, init_logging, smoke_run, CliArgs};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level)?;

    info!("=== Paddle Inference v{} ===", env!("CARGO_PKG_VERSION"));

    let config = inference_api::load_config(&args.config_path)?;
    info!("Engine: {}", config.kind());

    let mut predictor = build_predictor(&config, args.mock)?;
    let summary = smoke_run(predictor.as_mut(), &args.shape)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
