//! Target archive resolution.

use std::path::{Path, PathBuf};

/// Extension every content package carries.
pub const TARGET_EXTENSION: &str = ".zip";

/// Append the package extension when the file name lacks it.
///
/// `target/site` becomes `target/site.zip`, `target/site.jar` becomes
/// `target/site.jar.zip`, and `target/site.zip` is returned as is.
pub fn resolve_target(target: &Path) -> PathBuf {
    let has_extension = target
        .file_name()
        .map(|n| n.to_string_lossy().ends_with(TARGET_EXTENSION))
        .unwrap_or(false);

    if has_extension {
        target.to_path_buf()
    } else {
        let mut name = target.as_os_str().to_owned();
        name.push(TARGET_EXTENSION);
        PathBuf::from(name)
    }
}
