use std::io;
use std::path::Path;

/// Write `contents` to `path` through a `*.tmp` sibling and a rename, so a
/// reader sees either the previous file or the complete new one.
///
/// Parent directories are created if missing.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, contents)?;
    std::fs::rename(&temp_path, path)
}
