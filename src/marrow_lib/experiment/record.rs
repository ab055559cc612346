use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;

use crate::constants::JOB_RECORD_FILE_NAME;
use crate::file_system::FileOperations;

/// Read the scheduler-assigned job ids recorded for an item directory.
///
/// Returns `None` when no record exists, which means the item was never
/// submitted (or its directory has been purged since).
pub fn read_record(dir: &Path, fs: &impl FileOperations) -> Result<Option<Vec<String>>> {
    let path = dir.join(JOB_RECORD_FILE_NAME);

    if !path.exists() {
        return Ok(None);
    }

    let ids: Vec<String> = fs
        .read_utf8(&path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if ids.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ids))
    }
}

/// Record the scheduler-assigned job ids for an item, one per line.
pub fn write_record(dir: &Path, ids: &[String], fs: &impl FileOperations) -> Result<PathBuf> {
    let path = dir.join(JOB_RECORD_FILE_NAME);

    let mut contents = ids.join("\n");
    contents.push('\n');

    fs.write_utf8_truncate(&path, &contents)?;

    Ok(path)
}
