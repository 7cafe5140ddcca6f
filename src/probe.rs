//! Duration probing

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::error::{LibraryError, Result};

/// Capability to read a video's playback duration
pub trait MetadataProber: Send + Sync {
    fn probe(&self, path: &Path) -> Result<Duration>;
}

/// Probe a file, falling back to a zero duration on failure
pub fn probe_or_zero(prober: &dyn MetadataProber, path: &Path) -> Duration {
    match prober.probe(path) {
        Ok(duration) => duration,
        Err(e) => {
            log::warn!("Duration probe failed for {}: {}", path.display(), e);
            Duration::ZERO
        }
    }
}

/// Prober backed by the `ffprobe` executable
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MetadataProber for FfprobeProber {
    fn probe(&self, path: &Path) -> Result<Duration> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                LibraryError::probe_error(path, format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(LibraryError::probe_error(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| LibraryError::probe_error(path, "no duration reported"))
    }
}

/// Parse seconds as printed by ffprobe ("12.345000", possibly "N/A")
fn parse_duration(text: &str) -> Option<Duration> {
    let secs: f64 = text.lines().next()?.trim().parse().ok()?;
    if secs < 0.0 {
        return None;
    }
    // Rejects NaN, infinity and values past Duration::MAX
    Duration::try_from_secs_f64(secs).ok()
}

/// Prober used when duration probing is switched off; every video reads as zero length
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProber;

impl MetadataProber for NoopProber {
    fn probe(&self, _path: &Path) -> Result<Duration> {
        Ok(Duration::ZERO)
    }
}
