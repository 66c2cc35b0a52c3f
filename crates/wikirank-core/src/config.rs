use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::progress::Progress;
use crate::triple::Namespace;

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "wikirank.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub centrality: CentralitySettings,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub namespace: Namespace,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            namespace: Namespace::default(),
            limit: None,
            progress_interval: default_progress_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralitySettings {
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for CentralitySettings {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
        }
    }
}

/// Direction of a ranked listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Largest score first.
    #[default]
    Descending,
    /// Smallest of the top-k first.
    Ascending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub order: SortOrder,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            dir: None,
        }
    }
}

impl CacheConfig {
    /// Cache directory to use, or `None` when caching is off or no
    /// platform cache directory exists.
    #[must_use]
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        self.dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("wikirank")))
    }
}

/// Parse a config file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not valid TOML for [`RankConfig`].
pub fn load_config_file(path: &Path) -> Result<RankConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<RankConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Per-user config location (`<config dir>/wikirank/config.toml`).
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wikirank/config.toml"))
}

/// Resolve the effective config.
///
/// Precedence: `explicit` path (must exist), `<project_root>/wikirank.toml`,
/// the per-user file, then built-in defaults.
///
/// # Errors
///
/// Fails if `explicit` is missing or any chosen file fails to parse.
pub fn load_config(explicit: Option<&Path>, project_root: &Path) -> Result<RankConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file {} does not exist", path.display());
        }
        return load_config_file(path);
    }

    let project = project_root.join(PROJECT_CONFIG_FILE);
    if project.exists() {
        return load_config_file(&project);
    }

    if let Some(user) = user_config_path().filter(|p| p.exists()) {
        return load_config_file(&user);
    }

    Ok(RankConfig::default())
}

const fn default_true() -> bool {
    true
}

const fn default_progress_interval() -> u64 {
    Progress::DEFAULT_INTERVAL
}

const fn default_damping() -> f64 {
    0.85
}

const fn default_max_iter() -> usize {
    100
}

const fn default_tolerance() -> f64 {
    1e-10
}

const fn default_top_k() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: RankConfig = toml::from_str("").expect("parse empty");
        assert!((cfg.centrality.damping - 0.85).abs() < f64::EPSILON);
        assert_eq!(cfg.centrality.max_iter, 100);
        assert_eq!(cfg.report.top_k, 10);
        assert_eq!(cfg.report.order, SortOrder::Descending);
        assert_eq!(cfg.input.namespace.as_str(), Namespace::DBPEDIA);
        assert_eq!(cfg.input.progress_interval, 1_000_000);
        assert!(cfg.input.limit.is_none());
        assert!(cfg.cache.enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: RankConfig = toml::from_str(
            r#"
            [input]
            limit = 5000000

            [centrality]
            damping = 0.5

            [report]
            order = "ascending"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.input.limit, Some(5_000_000));
        assert!((cfg.centrality.damping - 0.5).abs() < f64::EPSILON);
        assert!((cfg.centrality.tolerance - 1e-10).abs() < f64::EPSILON);
        assert_eq!(cfg.report.order, SortOrder::Ascending);
    }

    #[test]
    fn project_file_is_picked_up() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[report]\ntop_k = 3\n",
        )
        .expect("write config");
        let cfg = load_config(None, dir.path()).expect("load");
        assert_eq!(cfg.report.top_k, 3);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[centrality\n").expect("write");
        let err = load_config_file(&path).expect_err("bad toml");
        assert!(format!("{err:#}").contains("bad.toml"));
    }

    #[test]
    fn disabled_cache_has_no_dir() {
        let cfg = CacheConfig {
            enabled: false,
            dir: Some(PathBuf::from("/tmp/x")),
        };
        assert!(cfg.resolved_dir().is_none());

        let cfg = CacheConfig {
            enabled: true,
            dir: Some(PathBuf::from("/tmp/x")),
        };
        assert_eq!(cfg.resolved_dir(), Some(PathBuf::from("/tmp/x")));
    }
}
