//! Deterministic content hashing for staged payloads.
//!
//! Status uses the tree hash to tell whether a destination still matches its
//! bundled source; wrapper provisioning uses the file hash to skip copying an
//! identical binary that may be locked by running services.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Payload entry as seen by the hasher, keyed by `/`-joined relative path.
enum Entry {
    Dir(String),
    File(String, PathBuf),
}

/// blake3 digest of a whole payload directory.
///
/// Paths are compared relative to `root` and visited in sorted order, so the
/// digest only depends on names and contents. Anything other than regular
/// files and directories is an error, matching what staging can copy.
pub fn hash_tree(root: &Path) -> anyhow::Result<String> {
    let mut entries = Vec::new();
    collect_entries(root, "", &mut entries)?;
    entries.sort_by(|a, b| entry_key(a).cmp(entry_key(b)));

    let mut hasher = blake3::Hasher::new();
    for entry in &entries {
        match entry {
            Entry::Dir(rel) => {
                hasher.update(b"d:");
                hasher.update(rel.as_bytes());
                hasher.update(b"\n");
            }
            Entry::File(rel, path) => {
                hasher.update(b"f:");
                hasher.update(rel.as_bytes());
                hasher.update(b"\n");
                hasher.update(hash_file(path)?.as_bytes());
            }
        }
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// blake3 hex digest of one file, streamed.
pub fn hash_file(path: &Path) -> anyhow::Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// True when both directories hold identical trees.
pub fn trees_match(a: &Path, b: &Path) -> anyhow::Result<bool> {
    Ok(hash_tree(a)? == hash_tree(b)?)
}

fn entry_key(entry: &Entry) -> &str {
    match entry {
        Entry::Dir(rel) | Entry::File(rel, _) => rel,
    }
}

fn collect_entries(dir: &Path, prefix: &str, out: &mut Vec<Entry>) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list: {}", dir.display()))? {
        let entry = entry.with_context(|| format!("Failed to list: {}", dir.display()))?;
        let path = entry.path();
        let rel = match prefix {
            "" => entry.file_name().to_string_lossy().into_owned(),
            _ => format!("{}/{}", prefix, entry.file_name().to_string_lossy()),
        };
        let kind = entry
            .file_type()
            .with_context(|| format!("Failed to stat: {}", path.display()))?;

        if kind.is_dir() {
            collect_entries(&path, &rel, out)?;
            out.push(Entry::Dir(rel));
        } else if kind.is_file() {
            out.push(Entry::File(rel, path));
        } else {
            anyhow::bail!("Cannot hash {}: not a file or directory", path.display());
        }
    }
    Ok(())
}
