//! Pre-flight disk space checks for large exports

use std::path::Path;

use tracing::warn;

use crate::error::{ClipError, ClipResult};

/// Fail fast when the target directory cannot hold an artifact of `required` bytes.
///
/// If the free-space query itself fails the check is skipped with a warning,
/// the export proceeds and any real shortage surfaces as a tool failure later.
pub fn check_disk_space(dir: &Path, required: u64) -> ClipResult<()> {
    match fs2::available_space(dir) {
        Ok(available) => {
            if available < required {
                return Err(ClipError::InsufficientDiskSpace {
                    required,
                    available,
                });
            }
            Ok(())
        }
        Err(e) => {
            warn!("Could not check disk space for {}: {}", dir.display(), e);
            Ok(())
        }
    }
}
