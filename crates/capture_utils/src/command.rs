use crate::error::{CaptureError, CaptureResult};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// A fully rendered ffmpeg/ffprobe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn spawn(&self, stdin: Stdio, stdout: Stdio, stderr: Stdio) -> CaptureResult<Child> {
        tracing::debug!(program = %self.program.display(), args = ?self.args, "spawning");
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(stdin).stdout(stdout).stderr(stderr);
        // Keep terminal Ctrl-C away from ffmpeg; the watcher closes clips itself.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd.spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    pub fn output(&self) -> CaptureResult<std::process::Output> {
        Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_argument_order() {
        let cmd = FfmpegCommand::new(Path::new("ffmpeg"))
            .args(["-v", "error"])
            .arg("-i")
            .arg("in.mp4");
        assert_eq!(cmd.args, vec!["-v", "error", "-i", "in.mp4"]);
        assert_eq!(cmd.program, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let cmd = FfmpegCommand::new(Path::new("/nonexistent/ffmpeg-binary"));
        let err = cmd.output().unwrap_err();
        assert!(matches!(err, CaptureError::Spawn { .. }));
    }
}
