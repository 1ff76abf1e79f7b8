//! Call-scoped scratch space.
//!
//! Every operation that needs files on disk creates one [`Scratch`] directory
//! with a random name. Individual files inside it are held as [`ScratchFile`]
//! guards that delete themselves when dropped, and the directory itself is
//! removed when the `Scratch` is dropped. Both run on every exit path,
//! including `?` returns and unwinding, so no caller has to clean up by hand.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};
use tracing::{debug, warn};

use crate::error::Result;

const DEFAULT_EXTENSION: &str = "tmp";

/// Uniquely named scratch directory owned by one call
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Create a scratch directory under `root`, or the system temp dir.
    pub fn new(root: Option<&Path>, prefix: &str) -> Result<Self> {
        let prefix = format!("{prefix}_");
        let mut builder = TempFileBuilder::new();
        builder.prefix(&prefix);

        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy a stream into scratch under the file name component of `filename`.
    pub fn materialize<R: Read + ?Sized>(&self, reader: &mut R, filename: &str) -> Result<ScratchFile> {
        let (stem, extension) = split_filename(filename);
        let file = self.reserve(&stem, &extension);

        let mut out = fs::File::create(file.path())?;
        let written = io::copy(reader, &mut out)?;
        out.sync_all()?;
        debug!("Materialized {} bytes into {}", written, file.path().display());
        Ok(file)
    }

    /// Guard for a path inside scratch that a later step will create
    pub fn reserve(&self, stem: &str, extension: &str) -> ScratchFile {
        ScratchFile::new(self.dir.path().join(format!("{stem}.{extension}")))
    }

    /// Remove the directory now. Failures are logged, never returned, so a
    /// cleanup problem cannot replace the result of the work it followed.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch directory {}: {}", path.display(), e);
        }
    }
}

/// A file path that is deleted when the guard is dropped
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension of the guarded path, `tmp` when it has none
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {}: {}", self.path.display(), e),
        }
    }
}

/// Split a caller-supplied name into a safe stem and extension.
/// Directory components are discarded.
fn split_filename(filename: &str) -> (String, String) {
    let name = Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = Path::new(&name);

    let stem = name
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "input".to_string());
    let extension = name
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    (stem, extension)
}
