use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use texcache_inspect::{
    assemble::ReconstructedImage,
    decode::{DecodeHint, RasterDecoder, decode_or_none},
    services::{FetchService, RecencyWindow, ScanOptions},
};

#[derive(Parser)]
#[command(name = "texcache-inspect")]
#[command(version)]
#[command(about = "Read-only inspector and reconstructor for viewer texture caches")]
#[command(long_about = None)]
struct Cli {
    /// Path to the texture.entries index file
    entries: PathBuf,

    /// Only include textures accessed within this window (e.g. "1h", "30d")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    max_age: Option<Duration>,

    /// Write each reconstructed codestream to DIR as <uuid>.j2c
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Attempt a raster decode of each reconstructed texture
    #[arg(long)]
    decode: bool,

    /// Emit one JSON object per texture instead of text lines
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = format!("texcache_inspect={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting texture cache inspection v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Some(dir) = &cli.export_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut service = FetchService::with_source(cli.entries.clone())?;

    let mut options = ScanOptions::rebuild();
    if let Some(max_age) = cli.max_age {
        info!("Limiting scan to textures accessed within the last {max_age:?}");
        options = options.with_recency(RecencyWindow::ending_now(max_age));
    }

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping scan");
            ctrl_c_cancel.cancel();
        }
    });

    let (tx, rx) = mpsc::channel::<ReconstructedImage>(64);
    let consumer = tokio::spawn(present_results(
        rx,
        cli.export_dir.clone(),
        cli.decode,
        cli.json,
    ));

    let summary = service.scan(options, tx, cancel).await?;
    consumer.await?;

    if cli.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "{} textures reconstructed ({} of {} declared entries decoded; {} stale, {} unreadable)",
            summary.yielded,
            summary.decoded_entries,
            summary.declared_entries,
            summary.skipped_stale,
            summary.skipped_unreadable
        );
    }

    Ok(())
}

/// Consume reconstructed textures as they arrive and present/export them.
async fn present_results(
    mut rx: mpsc::Receiver<ReconstructedImage>,
    export_dir: Option<PathBuf>,
    decode: bool,
    json: bool,
) {
    let decoder = RasterDecoder;

    while let Some(image) = rx.recv().await {
        let report = image.integrity();

        let raster = if decode {
            decode_or_none(&decoder, image.entry.id, &image.bytes, DecodeHint::Thumbnail)
        } else {
            None
        };

        if json {
            let line = serde_json::json!({
                "id": image.entry.id,
                "bytes": image.len(),
                "last_access": image.entry.last_access().to_rfc3339(),
                "magic_ok": report.magic_ok,
                "declared_len": report.declared_len,
                "decoded": decode.then(|| raster.is_some()),
            });
            println!("{line}");
        } else {
            let decode_note = match (decode, &raster) {
                (false, _) => String::new(),
                (true, Some(r)) => format!("  [{}x{}]", r.width(), r.height()),
                (true, None) => "  [no image available]".to_string(),
            };
            println!(
                "{}  {:>9} bytes  last access {}{}",
                image.entry.id,
                image.len(),
                image.entry.last_access().format("%Y-%m-%d %H:%M:%S"),
                decode_note
            );
        }

        if let Some(dir) = &export_dir {
            let path = dir.join(format!("{}.j2c", image.entry.id));
            if let Err(e) = tokio::fs::write(&path, &image.bytes).await {
                warn!("Failed to export {:?}: {}", path, e);
            }
        }
    }
}
