//! Filesystem boundary.
//!
//! Every file and directory operation the pipeline needs goes through
//! [`FileHandler`], which catches I/O errors at this boundary, logs them and
//! reports plain booleans (or `None` for reads). Nothing here panics or
//! propagates an error upwards.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

/// Default permissions for created directories: read, write and execute for
/// the owning user only.
#[cfg(unix)]
pub const DEFAULT_DIR_MODE: u32 = 0o700;

/// Performs all file and directory operations for the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHandler;

impl FileHandler {
    /// True iff `location` exists and is a regular file.
    pub fn file_exists(&self, location: &str) -> bool {
        Path::new(location).is_file()
    }

    /// True iff `location` exists and is a directory.
    pub fn directory_exists(&self, location: &str) -> bool {
        Path::new(location).is_dir()
    }

    /// Creates a directory, including missing parents.
    ///
    /// Creation is idempotent: a directory that already exists counts as
    /// success. On Unix the directory is created with `mode`, defaulting to
    /// owner-only permissions.
    pub fn create_directory(&self, full_path: &str, mode: Option<u32>) -> bool {
        if full_path.trim().is_empty() {
            warn!("{:?} is not a valid path.", full_path);
            return false;
        }
        if Path::new(full_path).exists() {
            debug!("{} already exists.", full_path);
            return true;
        }
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode.unwrap_or(DEFAULT_DIR_MODE));
        }
        #[cfg(not(unix))]
        let _ = mode;
        match builder.create(full_path) {
            Ok(()) => {
                debug!("Created directory at {}.", full_path);
                true
            }
            Err(err) => {
                warn!("Unable to create directory at {}: {}.", full_path, err);
                false
            }
        }
    }

    /// Creates the `keys`, `csrs` and `crts` subdirectories under `base`.
    ///
    /// All three are always attempted; a failure for one must not block the
    /// others. Returns true only when all three succeeded.
    pub fn ensure_layout(&self, base: &str) -> bool {
        debug!("Generating directory structure at {}.", base);
        let mut result = true;
        for subdir in ["keys", "csrs", "crts"] {
            result &= self.create_directory(&format!("{base}/{subdir}"), None);
        }
        result
    }

    /// Reads the content of a file, or `None` if it could not be read.
    pub fn read(&self, filename: &str) -> Option<String> {
        debug!("Attempting to read data from file {}.", filename);
        match fs::read_to_string(filename) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!("Unable to read file {}: {}.", filename, err);
                None
            }
        }
    }

    /// Writes `data` to a file, truncating any previous content.
    pub fn write(&self, filename: &str, data: &str) -> bool {
        debug!("Attempting to write data to file {}.", filename);
        match fs::write(filename, data) {
            Ok(()) => true,
            Err(err) => {
                warn!("Unable to write file {}: {}.", filename, err);
                false
            }
        }
    }
}
