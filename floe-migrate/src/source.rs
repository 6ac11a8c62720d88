//! Migration file discovery and parsing.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tracing::debug;

use crate::error::{MigrateError, MigrateResult};

/// Recognized migration file extensions.
///
/// `.sql` files hold a single raw statement; `.json` files hold an
/// ordered list of statement strings.
const EXTENSIONS: [&str; 2] = ["sql", "json"];

/// A migration file found on disk, not yet applied or validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Version parsed from the filename prefix.
    pub version: u32,
    /// Path to the script.
    pub path: PathBuf,
    /// Lowercase hex MD5 of the raw file bytes.
    pub fingerprint: String,
}

/// Reads candidate migrations out of a directory.
pub struct MigrationSource {
    dir: PathBuf,
}

impl MigrationSource {
    /// Create a source over a migrations directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the migrations directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the immediate entries of the directory and build the
    /// candidate set, sorted ascending by version.
    ///
    /// Files without a recognized extension are ignored; files with a
    /// recognized extension but no parseable version prefix fail with
    /// [`MigrateError::MalformedFilename`] before anything is applied.
    pub async fn scan(&self) -> MigrateResult<Vec<Candidate>> {
        let mut candidates = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !has_migration_extension(name) {
                continue;
            }

            let version = parse_version(name).ok_or_else(|| MigrateError::MalformedFilename {
                path: name.to_string(),
            })?;

            let bytes = tokio::fs::read(&path).await?;
            candidates.push(Candidate {
                version,
                fingerprint: fingerprint(&bytes),
                path,
            });
        }

        // Directory iteration order is not guaranteed.
        candidates.sort_by_key(|c| c.version);

        debug!(
            dir = %self.dir.display(),
            count = candidates.len(),
            "scanned migration directory"
        );
        Ok(candidates)
    }
}

/// Load the ordered statement list for one migration script.
pub async fn load_statements(path: &Path) -> MigrateResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;

    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&content).map_err(|e| MigrateError::InvalidStatements {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    } else {
        Ok(vec![content])
    }
}

/// Compute the content fingerprint of a migration script.
///
/// MD5 is used for equality only; drift detection needs no collision
/// resistance, and the ledger column carrying it is named `md5`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn has_migration_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.contains(&e))
}

/// Parse the version from a filename like `V3_add_flags.sql`.
///
/// A single non-digit prefix character (historically `V`) is tolerated;
/// the version is the leading digit run that follows.
fn parse_version(name: &str) -> Option<u32> {
    let stem = name.split('_').next().unwrap_or(name);
    let rest = stem
        .strip_prefix(|c: char| !c.is_ascii_digit())
        .unwrap_or(stem);

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];

    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
