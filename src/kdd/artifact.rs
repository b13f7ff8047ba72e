use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::ArtifactError;

/// Extension of every report written by the pipeline.
pub const REPORT_EXTENSION: &str = "txt";

/// Upper bound on `_N` suffixes tried before giving up on a name.
const MAX_SUFFIX: usize = 10_000;

// ---------------------------------------------------------------------------
// ArtifactStore – directory that receives strategy reports
// ---------------------------------------------------------------------------

/// A directory that strategy reports are written into.
///
/// Names never collide: if `stem.txt` exists the next free `stem_1.txt`,
/// `stem_2.txt`, … is used. Files are opened with `create_new`, so a name
/// taken between the existence check and the write is skipped rather than
/// overwritten.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.root.join(file_name).exists()
    }

    /// `stem.txt` for `attempt == 0`, otherwise `stem_<attempt>.txt`.
    pub fn file_name(stem: &str, attempt: usize) -> String {
        if attempt == 0 {
            format!("{stem}.{REPORT_EXTENSION}")
        } else {
            format!("{stem}_{attempt}.{REPORT_EXTENSION}")
        }
    }

    /// First path for `stem` that does not exist yet.
    pub fn next_free_path(&self, stem: &str) -> PathBuf {
        let attempt = (0..MAX_SUFFIX)
            .find(|&n| !self.exists(&Self::file_name(stem, n)))
            .unwrap_or(MAX_SUFFIX);
        self.root.join(Self::file_name(stem, attempt))
    }

    /// Write `contents` under a fresh name derived from `stem`.
    pub fn persist(&self, stem: &str, contents: &str) -> Result<PathBuf, ArtifactError> {
        if stem.is_empty() || stem.contains(['/', '\\']) {
            return Err(ArtifactError::InvalidName(stem.to_string()));
        }
        std::fs::create_dir_all(&self.root).map_err(|source| ArtifactError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut path = self.next_free_path(stem);
        for _ in 0..MAX_SUFFIX {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_remove(file, &path, contents)?;
                    log::debug!("wrote artifact {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::debug!("{} was taken, retrying", path.display());
                    path = self.next_free_path(stem);
                }
                Err(source) => return Err(ArtifactError::Io { path, source }),
            }
        }
        Err(ArtifactError::Io {
            path,
            source: std::io::Error::new(ErrorKind::AlreadyExists, "no free artifact name"),
        })
    }
}

/// Write `contents` to the freshly created `path`. On failure the partial
/// file is removed so its name is free for later runs.
fn write_or_remove(mut out: impl Write, path: &Path, contents: &str) -> Result<(), ArtifactError> {
    let result = out.write_all(contents.as_bytes()).and_then(|()| out.flush());
    drop(out);
    if let Err(source) = result {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("could not remove partial artifact {}: {e}", path.display());
        }
        return Err(ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// `file://` URI for a persisted artifact.
pub fn file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let text = absolute.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}
