//! Content-addressed cache for built link graphs.
//!
//! Building the graph dominates a run on a full dump, and the result depends
//! only on the two input files, the namespace and the edge limit. The key is
//! a blake3 digest over exactly those; the value is the serialized
//! [`LinkGraph`].
//!
//! ```text
//! <cache dir>/graph-<hex>.json
//! ```
//!
//! Entries are written to a temporary sibling and renamed into place, so a
//! reader never observes a partial file. An entry that fails to parse,
//! whose version or key does not match, or whose graph fails
//! [`LinkGraph::validate`], is treated as a miss.
//!
//! Inputs that are not regular files (pipes, `/dev/stdin`) cannot be hashed
//! without consuming them, so they never produce a key.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ErrorCode;
use crate::graph::LinkGraph;
use crate::triple::Namespace;

/// Bumped whenever the serialized [`LinkGraph`] layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const KEY_DOMAIN: &[u8] = b"wikirank:link-graph";

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// Digest identifying one graph build, formatted `blake3:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash both inputs plus the build parameters.
    ///
    /// Returns `Ok(None)` when either path is not a regular file.
    ///
    /// # Errors
    ///
    /// Fails if a regular input file cannot be opened or read.
    pub fn from_inputs(
        redirects: &Path,
        links: &Path,
        namespace: &Namespace,
        limit: Option<usize>,
    ) -> Result<Option<Self>> {
        if !is_regular_file(redirects) || !is_regular_file(links) {
            debug!("cache bypassed for non-regular input");
            return Ok(None);
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());
        hash_str(&mut hasher, namespace.as_str());
        match limit {
            Some(limit) => {
                hasher.update(&[1]);
                hasher.update(&(limit as u64).to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hash_file(&mut hasher, redirects)?;
        hash_file(&mut hasher, links)?;

        Ok(Some(Self(format!("blake3:{}", hasher.finalize().to_hex()))))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn file_name(&self) -> String {
        let hex = self.0.strip_prefix("blake3:").unwrap_or(&self.0);
        format!("graph-{hex}.json")
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file())
}

fn hash_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_file(hasher: &mut blake3::Hasher, path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    hasher.update(&len.to_le_bytes());
    io::copy(&mut BufReader::new(file), hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// GraphCache
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EntryRef<'a> {
    version: u32,
    key: &'a CacheKey,
    graph: &'a LinkGraph,
}

#[derive(Deserialize)]
struct Entry {
    version: u32,
    key: CacheKey,
    graph: LinkGraph,
}

/// Directory of cached graphs.
#[derive(Debug, Clone)]
pub struct GraphCache {
    dir: PathBuf,
}

impl GraphCache {
    /// Open (creating if needed) the cache directory.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the entry for `key`.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Look up a graph. Any unreadable entry counts as a miss.
    #[must_use]
    pub fn load(&self, key: &CacheKey) -> Option<LinkGraph> {
        let path = self.entry_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache entry unreadable");
                return None;
            }
        };

        let entry: Entry = match serde_json::from_reader(BufReader::new(file)) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    code = %ErrorCode::CacheCorrupt,
                    path = %path.display(),
                    error = %e,
                    "discarding corrupt cache entry"
                );
                return None;
            }
        };

        if entry.version != CACHE_FORMAT_VERSION || entry.key != *key {
            warn!(
                code = %ErrorCode::CacheCorrupt,
                path = %path.display(),
                version = entry.version,
                "discarding stale cache entry"
            );
            return None;
        }

        if let Err(e) = entry.graph.validate() {
            warn!(
                code = %ErrorCode::CacheCorrupt,
                path = %path.display(),
                error = %e,
                "discarding corrupt cache entry"
            );
            return None;
        }

        info!(
            %key,
            nodes = entry.graph.node_count(),
            edges = entry.graph.edge_count(),
            "cache hit"
        );
        Some(entry.graph)
    }

    /// Persist `graph` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Fails if the entry cannot be written or renamed into place.
    pub fn store(&self, key: &CacheKey, graph: &LinkGraph) -> Result<PathBuf> {
        let path = self.entry_path(key);
        let tmp = path.with_extension(format!("json.tmp.{}", std::process::id()));

        let write = || -> Result<()> {
            let file = File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(
                &mut writer,
                &EntryRef {
                    version: CACHE_FORMAT_VERSION,
                    key,
                    graph,
                },
            )
            .context("Failed to serialize link graph")?;
            writer.flush().context("Failed to flush cache entry")?;
            Ok(())
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move cache entry to {}", path.display()))?;

        debug!(%key, path = %path.display(), "cache entry stored");
        Ok(path)
    }
}
