use std::path::Path;

use anyhow::Context;
use tracing::info;
use xp3_archive::Archive;

use crate::KeyArgs;

/// Extract every entry of `archive` under `output`.
pub fn handle(archive: &Path, output: &Path, keys: &KeyArgs) -> anyhow::Result<()> {
    let key = keys.resolve()?;

    let mut archive = Archive::open(archive)?;
    let count = archive.entries().len();

    archive
        .extract_to(output, key)
        .with_context(|| format!("extracting into {}", output.display()))?;

    info!("Extracted {} entries to {}", count, output.display());
    Ok(())
}
