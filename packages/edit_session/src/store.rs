//! Session-scoped temp files under one private directory per run.

use native_messaging::NewText;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::registry::SessionRegistry;

/// Joins the sanitized subject to the generated part of a file name.
const STEM_SEPARATOR: &str = "-";

/// A temp file owned by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFile {
    /// Absolute path handed to the editor.
    pub path: PathBuf,
    /// Base name, as seen in watch events and used as the registry key.
    pub filename: String,
}

/// Replace every character that is not a letter or decimal digit with `_`.
pub fn sanitize_stem(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if is_letter(c) || is_decimal_digit(c) { c } else { '_' })
        .collect()
}

// Identifier-start characters are the letters plus letter numbers (Nl); the
// numeric filter drops the latter. Combining marks never start identifiers.
fn is_letter(c: char) -> bool {
    unicode_ident::is_xid_start(c) && !c.is_numeric()
}

// Numerics that may continue but not start an identifier are the decimal
// digits (Nd). Superscripts and other No numbers are in neither set.
fn is_decimal_digit(c: char) -> bool {
    c.is_numeric() && unicode_ident::is_xid_continue(c) && !unicode_ident::is_xid_start(c)
}

/// Owns the per-run temp directory and the files inside it.
#[derive(Debug)]
pub struct TempStore {
    dir: TempDir,
    registry: Arc<SessionRegistry>,
}

impl TempStore {
    /// Create `app_root` if needed, then a fresh private directory inside it.
    pub fn open(app_root: &Path, registry: Arc<SessionRegistry>) -> Result<Self, StoreError> {
        create_private_dir(app_root).map_err(|source| StoreError::CreateDir {
            path: app_root.to_path_buf(),
            source,
        })?;

        let dir = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(app_root)
            .map_err(|source| StoreError::CreateDir {
                path: app_root.to_path_buf(),
                source,
            })?;

        info!(dir = %dir.path().display(), "created temp directory");
        Ok(Self { dir, registry })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Write `request.text` to a new uniquely named file and register it.
    ///
    /// The name is `<sanitized subject>-<random>.<extension>`. Nothing is
    /// registered unless the file was fully written.
    pub async fn create(&self, request: &NewText) -> Result<TempFile, StoreError> {
        let prefix = format!("{}{}", sanitize_stem(&request.subject), STEM_SEPARATOR);
        let suffix = match request.file_extension() {
            "" => String::new(),
            ext => format!(".{ext}"),
        };

        let dir = self.dir().to_path_buf();
        let text = request.text.clone();
        let path = tokio::task::spawn_blocking(move || {
            write_new_file(&dir, &prefix, &suffix, text.as_bytes())
        })
        .await
        .map_err(|e| StoreError::CreateFile {
            dir: self.dir().to_path_buf(),
            source: std::io::Error::other(e),
        })??;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.registry.register(&filename, &request.id).await;
        debug!(session = %request.id, path = %path.display(), "created temp file");

        Ok(TempFile { path, filename })
    }

    /// Read the current content of a live session file.
    ///
    /// Returns the owning session id with the content. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub async fn read(&self, filename: &str) -> Result<(String, String), StoreError> {
        let id = self
            .registry
            .lookup(filename)
            .await
            .ok_or_else(|| StoreError::UnknownFile(filename.to_string()))?;

        let path = self.dir().join(filename);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| StoreError::Read { path, source })?;

        Ok((id, String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Best-effort delete. The run directory is removed wholesale at
    /// shutdown, so failures are only logged.
    pub async fn remove(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "removed temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "temp file already gone");
            }
            Err(e) => warn!(path = %path.display(), "failed to remove temp file: {}", e),
        }
    }

    /// Remove the run directory and anything left in it.
    pub fn close(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        info!(dir = %path.display(), "removed temp directory");
        Ok(())
    }
}

/// Create, fill and keep one uniquely named file. Blocking.
fn write_new_file(
    dir: &Path,
    prefix: &str,
    suffix: &str,
    contents: &[u8],
) -> Result<PathBuf, StoreError> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|source| StoreError::CreateFile {
            dir: dir.to_path_buf(),
            source,
        })?;

    // A failed write drops `file`, which deletes it.
    file.write_all(contents).map_err(|source| StoreError::Write {
        path: file.path().to_path_buf(),
        source,
    })?;

    file.into_temp_path().keep().map_err(|e| StoreError::Write {
        path: e.path.to_path_buf(),
        source: e.error,
    })
}

fn create_private_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}
