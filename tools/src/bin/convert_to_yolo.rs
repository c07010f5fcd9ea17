use clap::Parser;
use std::path::PathBuf;

use cli_support::common::ConfigArgs;
use face_dataset::ValidationOutcome;
use watchpost_tools::convert_dataset;

#[derive(Parser, Debug)]
#[command(about = "Convert WIDER FACE annotations into a YOLO face dataset")]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    /// Extracted WIDER FACE root (wider_face_split/, WIDER_train/, WIDER_val/).
    #[arg(long)]
    wider_root: Option<PathBuf>,
    /// Output dataset root.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Splits to convert (repeatable).
    #[arg(long = "split")]
    splits: Vec<String>,
    /// Write labels only; leave images where they are.
    #[arg(long, default_value_t = false)]
    no_copy: bool,
    /// Boxes smaller than this many pixels on either side are skipped.
    #[arg(long)]
    min_box_px: Option<u32>,
    /// Also print the validation reports as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing("info");
    let args = Args::parse();
    let mut settings = args.config.load().dataset;
    if let Some(root) = args.wider_root {
        settings.wider_root = root;
    }
    if let Some(out) = args.out {
        settings.out_root = out;
    }
    if !args.splits.is_empty() {
        settings.splits = args.splits;
    }
    if let Some(px) = args.min_box_px {
        settings.min_box_px = px;
    }
    if args.no_copy {
        settings.copy_images = false;
    }

    let run = convert_dataset(&settings)?;
    for report in &run.reports {
        let s = &report.summary;
        println!(
            "{}: {} images, {} boxes ({} skipped), {} missing, {} empty [{}]",
            s.split,
            s.images,
            s.boxes,
            s.skipped_boxes,
            s.missing_images,
            s.empty_images,
            report.outcome.as_str()
        );
    }
    if let Some(path) = &run.config_path {
        println!("dataset config written to {}", path.display());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    }
    if run.outcome == ValidationOutcome::Fail {
        anyhow::bail!("dataset validation failed");
    }
    Ok(())
}
