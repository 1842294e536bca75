use super::types::ReviewState;
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs::File;
use std::path::Path;

/// Load review state from a JSON file
///
/// If the file doesn't exist, returns a new empty state.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_review_state(path: &Path) -> Result<ReviewState> {
    if !path.exists() {
        return Ok(ReviewState::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open review state file at {}", path.display()))?;

    let state: ReviewState =
        serde_json::from_reader(file).context("Failed to load review state")?;

    if state.version != 1 {
        anyhow::bail!("Unsupported review state version: {}", state.version);
    }

    Ok(state)
}

/// Save review state to a JSON file atomically
///
/// The file is never left half-written. Creates the parent directory if it
/// doesn't exist.
pub fn save_review_state(path: &Path, state: &ReviewState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, state).context("Failed to serialize review state")?;

    file.commit().context("Failed to save review state")?;

    Ok(())
}
