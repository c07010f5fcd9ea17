//! External training invocation rendered from a template.

use crate::types::{DatasetError, DatasetResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

pub const DEFAULT_TRAIN_TEMPLATE: &str =
    "yolo detect train model=${MODEL} data=${DATA} imgsz=${IMGSZ} epochs=${EPOCHS} batch=${BATCH} ${EXTRA_ARGS}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSettings {
    pub template: String,
    /// Starting weights.
    pub model: String,
    /// Dataset description (`face.yaml`).
    pub data: PathBuf,
    pub imgsz: u32,
    pub epochs: u32,
    pub batch: u32,
    pub extra_args: String,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            template: DEFAULT_TRAIN_TEMPLATE.to_string(),
            model: "yolov8n.pt".to_string(),
            data: PathBuf::from("face.yaml"),
            imgsz: 640,
            epochs: 50,
            batch: 16,
            extra_args: String::new(),
        }
    }
}

fn render_template(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, val) in replacements {
        let needle = format!("${{{}}}", key);
        out = out.replace(&needle, val);
    }
    out
}

const EXTRA_ARGS_TOKEN: &str = "${EXTRA_ARGS}";

/// A rendered training command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TrainCommand {
    pub fn render(settings: &TrainSettings) -> DatasetResult<Self> {
        let data = settings.data.display().to_string();
        let imgsz = settings.imgsz.to_string();
        let epochs = settings.epochs.to_string();
        let batch = settings.batch.to_string();
        let replacements = [
            ("MODEL", settings.model.as_str()),
            ("DATA", data.as_str()),
            ("IMGSZ", imgsz.as_str()),
            ("EPOCHS", epochs.as_str()),
            ("BATCH", batch.as_str()),
            ("EXTRA_ARGS", settings.extra_args.trim()),
        ];
        // Split the template first so substituted values stay one argument
        // even when they contain spaces; extra args expand to several.
        let mut parts = Vec::new();
        for token in settings.template.split_whitespace() {
            if token == EXTRA_ARGS_TOKEN {
                parts.extend(settings.extra_args.split_whitespace().map(str::to_string));
                continue;
            }
            let arg = render_template(token, &replacements);
            if !arg.is_empty() {
                parts.push(arg);
            }
        }
        let mut parts = parts.into_iter();
        let program = parts
            .next()
            .ok_or_else(|| DatasetError::EmptyCommand(settings.template.clone()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Shell-style rendering; arguments with whitespace are single-quoted.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|arg| {
                if arg.chars().any(char::is_whitespace) {
                    format!("'{arg}'")
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command, inheriting stdio.
    pub fn run(&self) -> DatasetResult<ExitStatus> {
        tracing::info!(command = %self.command_line(), "launching training");
        Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|e| DatasetError::io(&self.program, e))
    }
}
