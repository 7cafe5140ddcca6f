//! Merging clips into one file with an external concatenation tool

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::LibraryConfig;
use crate::db::CatalogStore;
use crate::error::{ErrorKind, LibraryError, Result};
use crate::models::NewEntry;
use crate::probe::{probe_or_zero, MetadataProber};
use crate::rename::validate_base_name;

/// Extension of merged output files
pub const MERGE_OUTPUT_EXTENSION: &str = "mp4";

/// Cooperative cancellation flag shared between a caller and a running merge
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Clears the in-progress flag on every exit path
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Concat demuxer list line for one source
fn concat_line(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

fn kill_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Remove a partial output this merge created
fn discard_output(output: &Path, existed_before: bool) {
    if existed_before || !output.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_file(output) {
        log::warn!("Failed to remove partial output {}: {}", output.display(), e);
    }
}

/// Single-flight merge runner
#[derive(Debug)]
pub struct MergeWorkflow {
    tool: PathBuf,
    poll_interval: Duration,
    in_progress: AtomicBool,
}

impl MergeWorkflow {
    /// Runner invoking `tool`, checking it every `poll_interval`
    pub fn new(tool: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            tool: tool.into(),
            poll_interval,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Runner using the configured ffmpeg and poll interval
    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            Duration::from_millis(config.merge_poll_interval_ms.max(1)),
        )
    }

    /// Whether a merge is currently running
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Concatenate `sources` in order into `{dir of first}/{output_base_name}.mp4`.
    ///
    /// On success the sources are deleted (failures logged), their catalog
    /// rows dropped, and the output catalogued. On failure or cancellation no
    /// source is touched and nothing is catalogued. A second call while one
    /// is running fails with `Busy`.
    pub fn merge(
        &self,
        store: &dyn CatalogStore,
        prober: &dyn MetadataProber,
        sources: &[PathBuf],
        output_base_name: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(LibraryError::busy("A merge is already in progress"));
        }
        let _guard = FlightGuard(&self.in_progress);

        let (sources, output) = plan_merge(sources, output_base_name)?;
        let title = validate_base_name(output_base_name)?;

        log::info!("Merging {} clips into {}", sources.len(), output.display());
        self.run_tool(&sources, &output, cancel)?;

        for source in &sources {
            match std::fs::remove_file(source) {
                Ok(()) => forget_source(store, source),
                Err(e) => log::warn!("Failed to delete merged source {}: {}", source.display(), e),
            }
        }

        if let Err(e) = catalog_output(store, prober, &output, title) {
            log::error!("Merged file {} could not be catalogued: {}", output.display(), e);
        }
        Ok(output)
    }

    fn run_tool(&self, sources: &[PathBuf], output: &Path, cancel: &CancellationToken) -> Result<()> {
        let mut list = tempfile::Builder::new()
            .prefix("concat-")
            .suffix(".txt")
            .tempfile()?;
        for source in sources {
            writeln!(list, "{}", concat_line(source))?;
        }
        list.flush()?;

        let existed_before = output.exists();
        let mut child = Command::new(&self.tool)
            .args(["-n", "-f", "concat", "-safe", "0", "-i"])
            .arg(list.path())
            .args(["-c", "copy"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LibraryError::tool_failed(format!("Failed to start {}: {}", self.tool.display(), e))
            })?;

        let stderr_handle = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).to_string()
            })
        });
        let collect_stderr =
            |handle: Option<thread::JoinHandle<String>>| handle.and_then(|h| h.join().ok()).unwrap_or_default();

        let status = loop {
            if cancel.is_cancelled() {
                log::info!("Merge into {} cancelled", output.display());
                kill_child(&mut child);
                collect_stderr(stderr_handle);
                discard_output(output, existed_before);
                return Err(LibraryError::cancelled());
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    kill_child(&mut child);
                    collect_stderr(stderr_handle);
                    discard_output(output, existed_before);
                    return Err(LibraryError::io(&self.tool, e));
                }
            }
        };

        let diagnostics = collect_stderr(stderr_handle);
        if !status.success() {
            discard_output(output, existed_before);
            return Err(LibraryError::new(
                ErrorKind::ToolFailed,
                Some(output.to_path_buf()),
                format!("{} exited with {}: {}", self.tool.display(), status, diagnostics.trim()),
            ));
        }
        Ok(())
    }
}

/// Validate inputs and compute the output path
fn plan_merge(sources: &[PathBuf], output_base_name: &str) -> Result<(Vec<PathBuf>, PathBuf)> {
    let name = validate_base_name(output_base_name)?;

    let sources: Vec<PathBuf> = sources
        .iter()
        .filter(|p| !p.as_os_str().is_empty())
        .cloned()
        .collect();
    if sources.len() < 2 {
        return Err(LibraryError::validation("At least two source videos are required"));
    }
    if let Some(missing) = sources.iter().find(|p| !p.is_file()) {
        return Err(LibraryError::new(
            ErrorKind::Validation,
            Some(missing.clone()),
            format!("Source does not exist: {}", missing.display()),
        ));
    }

    let dir = sources[0].parent().unwrap_or_else(|| Path::new("."));
    let output = dir.join(format!("{}.{}", name, MERGE_OUTPUT_EXTENSION));
    Ok((sources, output))
}

fn forget_source(store: &dyn CatalogStore, source: &Path) {
    let result = store
        .get_by_path(source)
        .and_then(|row| row.map(|row| store.delete(row.id)).transpose());
    if let Err(e) = result {
        log::warn!("Failed to drop catalog row for {}: {}", source.display(), e);
    }
}

fn catalog_output(
    store: &dyn CatalogStore,
    prober: &dyn MetadataProber,
    output: &Path,
    title: &str,
) -> Result<()> {
    let metadata = std::fs::metadata(output).map_err(|e| LibraryError::io(output, e))?;
    let entry = NewEntry::new(title, output.to_path_buf())
        .with_file_size(metadata.len())
        .with_duration(probe_or_zero(prober, output))
        .with_creation_date(metadata.created().ok().map(DateTime::<Utc>::from));
    store.upsert(&entry)?;
    Ok(())
}
