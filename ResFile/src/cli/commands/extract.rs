//! CLI command for entry extraction

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};

use crate::{Entry, ResourceFile};

/// Where `name` lands below `destination`, or `None` if the name would
/// escape it.
fn output_path(destination: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    if relative.components().all(|c| matches!(c, Component::Normal(_))) {
        Some(destination.join(relative))
    } else {
        None
    }
}

fn extract_one(archive: &mut ResourceFile, index: usize, destination: &Path) -> anyhow::Result<()> {
    let name = archive.entry_name(index).unwrap_or_default().to_string();
    let Some(target) = output_path(destination, &name) else {
        tracing::warn!("skipping '{name}': path leaves the output directory");
        return Ok(());
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut reader = archive.entry_reader(index, false)?;
    let mut out = BufWriter::new(File::create(&target)?);
    io::copy(&mut reader, &mut out).with_context(|| format!("extracting '{name}'"))?;
    tracing::debug!("wrote {}", target.display());
    Ok(())
}

pub fn execute(archive: &mut ResourceFile, destination: &Path, entry: Option<&str>) -> anyhow::Result<()> {
    if let Some(name) = entry {
        let Some(index) = archive.find_entry(name) else {
            bail!("no entry named '{name}' in {}", archive.file_name());
        };
        extract_one(archive, index, destination)?;
        println!("Extracted {name}");
        return Ok(());
    }

    let mut extracted = 0usize;
    let mut failed = 0usize;
    for index in 0..archive.entry_count() {
        if archive.entry(index).is_none_or(Entry::is_purged) {
            continue;
        }
        match extract_one(archive, index, destination) {
            Ok(()) => extracted += 1,
            Err(e) => {
                tracing::error!("{e:#}");
                failed += 1;
            }
        }
    }

    println!("Extracted {extracted} entries to {}", destination.display());
    if failed > 0 {
        bail!("{failed} entries could not be extracted");
    }
    Ok(())
}
