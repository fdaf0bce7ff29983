//! Output emission and the backup protocol
//!
//! Every emitted file is wrapped in `//BEGIN:<path>` / `//END:<path>`
//! comment markers so a concatenated stream of results can be split back
//! into per-file artifacts. During processing each input is copied into a
//! `.work` directory with a `.bak` suffix; backups are removed once the run
//! succeeds.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Wrap file content in begin/end markers, unless it is already marked
pub fn wrap_with_markers(content: &str, original_path: &str) -> String {
    if content.trim_start().starts_with("//BEGIN:") {
        return content.to_string();
    }
    format!(
        "//BEGIN:{}\n{}\n//END:{}",
        original_path, content, original_path
    )
}

/// Original path recorded in a marked content's first line
pub fn marker_path(content: &str) -> Option<&str> {
    let first = content.trim_start().lines().next()?;
    first.strip_prefix("//BEGIN:")
}

/// Content with the begin/end marker lines removed
pub fn strip_markers(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.starts_with("//BEGIN:") && !line.starts_with("//END:"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Copy one input into the work directory with a `.bak` suffix, recording
/// the original path in a marker head line. Returns the backup path.
pub fn backup_file(input: &Path, work_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(work_dir)?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input.sv".to_string());
    let backup = work_dir.join(format!("{}.bak", name));
    let content = fs::read_to_string(input)?;
    fs::write(
        &backup,
        format!("//BEGIN:{}\n{}", input.display(), content),
    )?;
    Ok(backup)
}

/// Remove backups; used after a successful run
pub fn remove_backups(backups: &[PathBuf]) {
    for backup in backups {
        let _ = fs::remove_file(backup);
    }
}

/// Write marked content into the output directory, named after the original
/// file recorded in the marker. Returns the written path, or `None` for
/// content without a marker (e.g. an empty failed rewrite).
pub fn write_output_file(content: &str, output_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(original) = marker_path(content) else {
        return Ok(None);
    };
    let name = Path::new(original)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.sv".to_string());
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(name);
    fs::write(&path, content)?;
    Ok(Some(path))
}
