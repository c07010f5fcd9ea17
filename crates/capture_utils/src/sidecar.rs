use data_contracts::capture::ClipManifest;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes a `ClipManifest` as `<clip stem>.json` next to the clip.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonClipSidecar;

impl JsonClipSidecar {
    pub fn path_for(clip: &Path) -> PathBuf {
        clip.with_extension("json")
    }

    pub fn write(&self, clip: &Path, manifest: &ClipManifest) -> std::io::Result<PathBuf> {
        manifest
            .validate()
            .map_err(|e| std::io::Error::other(format!("validation failed: {e}")))?;
        let out = Self::path_for(clip);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(&out)?);
        serde_json::to_writer_pretty(&mut writer, manifest)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(out)
    }

    pub fn read(path: &Path) -> std::io::Result<ClipManifest> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
