use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use cli_support::common::{ConfigArgs, DetectArgs};
use inference::{CascadePaths, DetectorFactory};
use watchpost_tools::{default_out_path, detect_image};

#[derive(Parser, Debug)]
#[command(about = "Run the face/body cascades on one image and emit a boxed PNG")]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    /// Input image path (any format supported by the `image` crate).
    #[arg(long)]
    image: PathBuf,
    /// Output path for the boxed image (defaults to <stem>_boxed.png alongside the input).
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    detect: DetectArgs,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing("warn");
    let args = Args::parse();
    let in_path = &args.image;
    if !in_path.exists() {
        anyhow::bail!("input image not found: {}", in_path.display());
    }
    let out_path = args.out.clone().unwrap_or_else(|| default_out_path(in_path));

    let mut cfg = args.config.load().detect;
    args.detect.apply(&mut cfg);
    let mut paths = CascadePaths::in_dir(&cfg.cascade_dir);
    if !cfg.body_enabled {
        paths.body = None;
    }
    let detectors = DetectorFactory.build(&paths, cfg.face, cfg.body)?;

    let img = image::open(in_path)
        .with_context(|| format!("failed to decode {}", in_path.display()))?
        .into_rgb8();
    let (boxed, found) = detect_image(&detectors, img, in_path);
    boxed.save(&out_path)?;
    eprintln!(
        "saved boxed image to {} ({} detections)",
        out_path.display(),
        found.detections.len()
    );
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}
