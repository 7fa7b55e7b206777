//! Archive-format compressors that only work through files on disk.
//!
//! PPMd is reached through a 7-Zip binary. Each call writes the packed
//! sequence to a uuid-named temporary file, asks 7-Zip for a `.7z` archive
//! next to it, reads the archive back, and removes both files. Removal is
//! tied to scope: it happens on every exit path, and a failed removal is
//! logged as a warning instead of failing the measurement.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempPath;
use uuid::Uuid;

use super::{Codec, CompressedArtifact};
use crate::error::{Error, Result};

/// 7-Zip executables tried for PPMd, in rank order.
pub const SEVEN_ZIP_PROGRAMS: &[&str] = &["7zz", "7z", "7za"];

/// Poll interval while waiting for the child process.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A file path that is removed when the guard goes out of scope.
#[derive(Debug)]
pub struct ScopedArtifact {
    path: PathBuf,
}

impl ScopedArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now, reporting failures. A missing file is not an error.
    pub fn close(self) -> Result<()> {
        let path = self.path.clone();
        std::mem::forget(self);
        remove_if_present(&path)
    }
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        if let Err(err) = remove_if_present(&self.path) {
            log::warn!("{err}");
        }
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::ResourceCleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Close a `tempfile` path, logging instead of failing.
fn release(input: TempPath) {
    let path = input.to_path_buf();
    if let Err(source) = input.close() {
        log::warn!("{}", Error::ResourceCleanup { path, source });
    }
}

/// Check if a command exists by running `which`.
pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// PPMd compression through one 7-Zip executable.
#[derive(Debug, Clone)]
pub struct SevenZipPpmd {
    program: String,
    label: String,
    timeout: Duration,
}

impl SevenZipPpmd {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            label: format!("ppmd/{program}"),
            timeout,
        }
    }

    /// Run 7-Zip on `input`, writing `archive`, killing it past the deadline.
    fn run_archiver(&self, input: &Path, archive: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(["a", "-t7z", "-m0=PPMd", "-mx=9", "-bd", "-y"])
            .arg(archive)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::codec(&self.label, format!("failed to start {}: {e}", self.program)))?;

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if status.success() {
                        return Ok(());
                    }
                    let mut stderr = String::new();
                    if let Some(mut pipe) = child.stderr.take() {
                        let _ = pipe.read_to_string(&mut stderr);
                    }
                    return Err(Error::codec(
                        &self.label,
                        format!("{} exited with {status}: {}", self.program, stderr.trim()),
                    ));
                }
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Error::Timeout {
                            what: self.label.clone(),
                            after: self.timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(Error::codec(&self.label, e)),
            }
        }
    }
}

impl Codec for SevenZipPpmd {
    fn name(&self) -> &str {
        &self.label
    }

    fn is_available(&self) -> bool {
        command_exists(&self.program)
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let prefix = format!("compstat-{}-", Uuid::new_v4());
        let mut input = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".bin")
            .tempfile()
            .map_err(|e| Error::codec(&self.label, format!("temporary file: {e}")))?;
        input
            .write_all(data)
            .and_then(|()| input.flush())
            .map_err(|e| Error::codec(&self.label, format!("writing input: {e}")))?;
        let input = input.into_temp_path();
        let archive = ScopedArtifact::new(input.with_extension("7z"));

        let result = self.run_archiver(&input, archive.path()).and_then(|()| {
            fs::read(archive.path())
                .map_err(|e| Error::codec(&self.label, format!("reading archive: {e}")))
        });

        if let Err(err) = archive.close() {
            log::warn!("{err}");
        }
        release(input);

        let bytes = result?;
        if bytes.is_empty() {
            return Err(Error::codec(&self.label, "archive is empty"));
        }
        Ok(CompressedArtifact {
            codec: self.label.clone(),
            data: bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed() -> Option<&'static str> {
        SEVEN_ZIP_PROGRAMS.iter().copied().find(|p| command_exists(p))
    }

    #[test]
    fn scoped_artifact_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.7z");
        fs::write(&path, b"x").unwrap();
        {
            let _guard = ScopedArtifact::new(&path);
        }
        assert!(!path.exists());
    }

    #[test]
    fn scoped_artifact_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let guard = ScopedArtifact::new(dir.path().join("never-created"));
        assert!(guard.close().is_ok());
    }

    #[test]
    fn scoped_artifact_reports_cleanup_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be removed with remove_file.
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), b"x").unwrap();
        let err = ScopedArtifact::new(&target).close().unwrap_err();
        assert!(matches!(err, Error::ResourceCleanup { .. }));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let codec = SevenZipPpmd::new("compstat-no-such-7zip", Duration::from_secs(1));
        assert!(!codec.is_available());
        assert!(matches!(codec.compress(b"abc"), Err(Error::CodecFailure { .. })));
    }

    #[test]
    fn ppmd_round_trip_leaves_no_files() {
        let Some(program) = installed() else {
            eprintln!("skipping: no 7-Zip binary on PATH");
            return;
        };
        let codec = SevenZipPpmd::new(program, Duration::from_secs(60));
        let before = count_compstat_files();
        let out = codec.compress(&vec![0xAAu8; 16 * 1024]).unwrap();
        assert!(out.len_bytes() < 1024);
        assert_eq!(out.codec, format!("ppmd/{program}"));
        assert_eq!(count_compstat_files(), before);
    }

    fn count_compstat_files() -> usize {
        fs::read_dir(std::env::temp_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_string_lossy().starts_with("compstat-"))
                    .count()
            })
            .unwrap_or(0)
    }
}
