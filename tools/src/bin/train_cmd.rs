use clap::Parser;
use std::path::PathBuf;

use cli_support::common::ConfigArgs;
use face_dataset::TrainCommand;

#[derive(Parser, Debug)]
#[command(about = "Print (or run) the face detector training command")]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    #[arg(long)]
    model: Option<String>,
    /// Dataset description produced by convert_to_yolo.
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long)]
    epochs: Option<u32>,
    #[arg(long)]
    imgsz: Option<u32>,
    #[arg(long)]
    batch: Option<u32>,
    /// Appended verbatim to the rendered command.
    #[arg(long)]
    extra_args: Option<String>,
    /// Execute the command instead of printing it.
    #[arg(long, default_value_t = false)]
    run: bool,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing("info");
    let args = Args::parse();
    let mut settings = args.config.load().training;
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(data) = args.data {
        settings.data = data;
    }
    if let Some(epochs) = args.epochs {
        settings.epochs = epochs;
    }
    if let Some(imgsz) = args.imgsz {
        settings.imgsz = imgsz;
    }
    if let Some(batch) = args.batch {
        settings.batch = batch;
    }
    if let Some(extra) = args.extra_args {
        settings.extra_args = extra;
    }

    let cmd = TrainCommand::render(&settings)?;
    if !args.run {
        println!("{}", cmd.command_line());
        return Ok(());
    }
    if !settings.data.exists() {
        tracing::warn!(data = %settings.data.display(), "dataset config not found");
    }
    let status = cmd.run()?;
    if !status.success() {
        anyhow::bail!("training exited with {status}");
    }
    Ok(())
}
