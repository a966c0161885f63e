use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use thumbrescue_core::CacheFile;

use crate::session::CacheFileSource;

/// Enumerates `thumbcache*.db` files in one directory, sorted by name so scan
/// order is stable across runs.
pub struct DirLocator {
    dir: PathBuf,
}

impl DirLocator {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl CacheFileSource for DirLocator {
    fn cache_files(&self) -> Result<Vec<CacheFile>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read cache directory {}", self.dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_thumbcache_name(&name) {
                continue;
            }
            if !entry.path().is_file() {
                continue;
            }
            files.push(CacheFile::new(entry.path()));
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

fn is_thumbcache_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("thumbcache") && lower.ends_with(".db")
}

/// Explorer's thumbnail cache for the first real user profile on the machine.
pub fn default_cache_dir() -> Result<PathBuf> {
    let users = Path::new(r"C:\Users");
    match discover_username(users) {
        Some(user) => Ok(users
            .join(user)
            .join(r"AppData\Local\Microsoft\Windows\Explorer")),
        None => bail!(
            "no user profile found under {}; pass --cache-dir explicitly",
            users.display()
        ),
    }
}

/// First profile directory that is not one of the stock Windows accounts.
fn discover_username(users_dir: &Path) -> Option<String> {
    const IGNORED: [&str; 4] = ["public", "default", "all users", "default user"];

    let entries = fs::read_dir(users_dir).ok()?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !IGNORED.contains(&name.to_ascii_lowercase().as_str()))
        .collect();

    names.sort();
    names.into_iter().next()
}
