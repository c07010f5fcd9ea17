use anyhow::Context;
use clap::Parser;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use watchpost_app::cli::AppArgs;
use watchpost_app::run_session;
use watchpost_app::shutdown::shutdown_signal;

fn main() -> anyhow::Result<()> {
    let args = AppArgs::parse();
    cli_support::init_tracing(&args.log_level);
    let cfg = args.resolve_config();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async move {
            let stop = Arc::new(AtomicBool::new(false));
            tokio::spawn(shutdown_signal(stop.clone()));

            let report = tokio::task::spawn_blocking(move || run_session(&cfg, stop))
                .await
                .context("watch loop panicked")??;

            for clip in &report.clips {
                tracing::info!(
                    clip = %clip.path.display(),
                    frames = clip.manifest.frames,
                    seconds = clip.manifest.duration_secs(),
                    "clip saved"
                );
            }
            if let Some(path) = &args.report {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(path, json + "\n")
                    .with_context(|| format!("failed to write report {}", path.display()))?;
            }
            Ok(())
        })
}
