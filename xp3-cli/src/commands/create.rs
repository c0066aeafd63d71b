use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::Context;
use tracing::{debug, info};
use walkdir::WalkDir;
use xp3_archive::ArchiveBuilder;

use crate::KeyArgs;

/// Pack `inputs` into a new archive at `archive`.
///
/// Plain files are packed under their file name. Directories are
/// walked recursively with their contents named relative to the
/// directory, so packing `patch/` containing `scenario/01.ks` yields
/// the entry `scenario/01.ks`.
pub fn handle(
    archive: &Path,
    inputs: &[PathBuf],
    no_compress: bool,
    keys: &KeyArgs,
) -> anyhow::Result<()> {
    let mut builder = ArchiveBuilder::new().with_compression(!no_compress);
    if let Some(key) = keys.resolve()? {
        builder = builder.with_key(key);
    }

    for input in inputs {
        if input.is_dir() {
            add_directory(&mut builder, input)?;
        } else {
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("unusable file name: {}", input.display()))?;
            add_file(&mut builder, name.to_string(), input)?;
        }
    }

    anyhow::ensure!(builder.entry_count() > 0, "nothing to pack");

    builder
        .write_to_file(archive)
        .with_context(|| format!("writing {}", archive.display()))?;
    info!(
        "Packed {} entries into {}",
        builder.entry_count(),
        archive.display()
    );
    Ok(())
}

fn add_directory(builder: &mut ArchiveBuilder, root: &Path) -> anyhow::Result<()> {
    for dirent in WalkDir::new(root).sort_by_file_name() {
        let dirent = dirent?;
        if !dirent.file_type().is_file() {
            continue;
        }

        let relative = dirent.path().strip_prefix(root)?;
        add_file(builder, entry_name(relative)?, dirent.path())?;
    }
    Ok(())
}

fn add_file(builder: &mut ArchiveBuilder, name: String, path: &Path) -> anyhow::Result<()> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let timestamp = fs::metadata(path).ok().and_then(|m| modified_ms(&m));

    debug!("Adding {} ({} bytes)", name, data.len());
    builder.add_entry(name, data, timestamp)?;
    Ok(())
}

/// Join a relative path into a `/`-separated entry name.
fn entry_name(relative: &Path) -> anyhow::Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .with_context(|| format!("non-UTF-8 file name: {}", relative.display()))?
                    .to_string(),
            ),
            other => anyhow::bail!(
                "unsupported path component {other:?} in {}",
                relative.display()
            ),
        }
    }
    Ok(parts.join("/"))
}

fn modified_ms(metadata: &fs::Metadata) -> Option<u64> {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|age| age.as_millis() as u64)
}
