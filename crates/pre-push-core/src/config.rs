//! Ambient tool configuration and manifest discovery.
//!
//! Two distinct documents live here, on purpose:
//!
//! - [`Config`] is this tool's own settings (log level, log directory,
//!   max parallelism) — small, optional, layered via `figment` the way
//!   the teacher layers its own config.
//! - [`load_manifest`] finds and parses the authoritative `.project.yml`
//!   manifest via `serde-saphyr` directly — it is not figment-merged,
//!   since a manifest has no "defaults to layer over": it either exists
//!   and validates, or the run fails.

use camino::{Utf8Path, Utf8PathBuf};
use figment::providers::{Format, Json, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::{Manifest, ManifestError};

/// Errors from loading ambient tool configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Figment failed to merge or deserialize a config source.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from locating or parsing the `.project.yml` manifest.
#[derive(Error, Debug)]
pub enum ManifestLoadError {
    /// No manifest file was found walking up from the search root.
    #[error("no .project.yml manifest found in {0} or any parent directory")]
    NotFound(Utf8PathBuf),

    /// Failed to read the manifest file.
    #[error("failed to read manifest at {path}: {source}")]
    Io {
        /// The manifest path that failed to read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest's YAML was malformed.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        /// The manifest path that failed to parse.
        path: Utf8PathBuf,
        /// The underlying parse error.
        source: serde_saphyr::Error,
    },

    /// The manifest parsed, but failed validation.
    #[error("invalid manifest at {path}: {source}")]
    Invalid {
        /// The manifest path that failed validation.
        path: Utf8PathBuf,
        /// The validation error.
        source: ManifestError,
    },
}

/// Result alias for manifest loading.
pub type ManifestLoadResult<T> = Result<T, ManifestLoadError>;

/// Filenames searched, in order, in each candidate directory.
const MANIFEST_NAMES: &[&str] = &[
    ".project.yml",
    ".project.yaml",
    "project.yml",
    "project.yaml",
    "pre-push.yml",
    "pre-push.yaml",
];

/// Ambient tool settings, layered from TOML/YAML/JSON config files —
/// distinct from the `.project.yml` manifest this tool executes.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level (`debug`, `info`, `warn`, `error`).
    pub log_level: LogLevel,
    /// Directory for JSONL log files; falls back to platform defaults.
    pub log_dir: Option<Utf8PathBuf>,
    /// Maximum worker threads for the scheduler. Defaults to the logical
    /// CPU count when unset.
    pub max_parallelism: Option<usize>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Lowercase string form, for the `RUST_LOG`-style filter directive.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported ambient config file extensions, tried in this order.
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name used for the ambient config file basename.
const APP_NAME: &str = "pre-push";

/// Builder for discovering and loading ambient [`Config`].
#[derive(Debug, Default)]
pub struct ConfigLoader {
    search_root: Option<Utf8PathBuf>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// A loader with no search root and no explicit files configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk up from `path` looking for `.pre-push.<ext>` / `pre-push.<ext>`.
    #[must_use]
    pub fn with_search_root<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load this file after any discovered one, taking highest precedence.
    #[must_use]
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Merge defaults, the discovered project config (if any), and any
    /// explicit files, in ascending precedence.
    pub fn load(self) -> ConfigResult<Config> {
        let mut figment =
            Figment::new().merge(figment::providers::Serialized::defaults(Config::default()));

        if let Some(root) = &self.search_root {
            if let Some(found) = Self::find(root) {
                figment = Self::merge_file(figment, &found);
            }
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        figment.extract().map_err(|e| ConfigError::Figment(Box::new(e)))
    }

    fn find(start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());
        while let Some(dir) = current {
            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }
                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }
            if dir.join(".git").exists() {
                break;
            }
            current = dir.parent().map(Utf8Path::to_path_buf);
        }
        None
    }

    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find and parse the `.project.yml` manifest, walking up from `start`.
///
/// Parses with `serde-saphyr` directly (no figment layering — a manifest
/// has no defaults to merge over) and validates before returning.
pub fn load_manifest(start: &Utf8Path) -> ManifestLoadResult<Manifest> {
    let path =
        find_manifest(start).ok_or_else(|| ManifestLoadError::NotFound(start.to_path_buf()))?;

    let contents = std::fs::read_to_string(&path).map_err(|source| ManifestLoadError::Io {
        path: path.clone(),
        source,
    })?;

    let manifest: Manifest =
        serde_saphyr::from_str(&contents).map_err(|source| ManifestLoadError::Parse {
            path: path.clone(),
            source,
        })?;

    manifest
        .validate()
        .map_err(|source| ManifestLoadError::Invalid { path, source })?;

    Ok(manifest)
}

/// Locate the manifest file without parsing it, walking up from `start`
/// through every name in [`MANIFEST_NAMES`] at each directory level.
#[must_use]
pub fn find_manifest(start: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = Some(start.to_path_buf());
    while let Some(dir) = current {
        for name in MANIFEST_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if dir.join(".git").exists() {
            break;
        }
        current = dir.parent().map(Utf8Path::to_path_buf);
    }
    None
}
