use std::{fs, path::Path};

use anyhow::Context;
use tracing::info;

use crate::model::AggregateResult;

pub const FRIEND_DATA_FILE: &str = "friend_data.json";
pub const LOST_FRIENDS_FILE: &str = "lost_friends.json";

/// Overwrite both output files under `dir`. Pretty-printed UTF-8; CJK text
/// is written as-is, not escaped.
pub fn save_data_to_files(
    result: &AggregateResult,
    lost: &AggregateResult,
    dir: &Path,
) -> anyhow::Result<()> {
    save_to_json(result, &dir.join(FRIEND_DATA_FILE))?;
    save_to_json(lost, &dir.join(LOST_FRIENDS_FILE))?;
    Ok(())
}

fn save_to_json(data: &AggregateResult, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data).context("failed to serialize dataset")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), articles = data.article_data.len(), "dataset saved");
    Ok(())
}

/// Read a persisted dataset back, used by merge tests and downstream
/// consumers of the output schema.
pub fn load_result(path: &Path) -> anyhow::Result<AggregateResult> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}
