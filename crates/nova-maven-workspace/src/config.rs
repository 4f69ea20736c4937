use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::prelude::*;

use crate::error::WorkspaceError;
use crate::path::absolutize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Aggregator (directory or `pom.xml`) to load before the start project, so that shared
    /// ancestors and siblings are part of the workspace.
    pub workspace_root: Option<PathBuf>,

    /// Build effective models (inheritance, profiles, interpolation). When disabled, raw models
    /// are used as-is.
    pub effective_model: bool,

    pub active_profiles: Vec<String>,
    pub inactive_profiles: Vec<String>,

    /// `-D` style user properties.
    pub user_properties: BTreeMap<String, String>,
}

impl LoadOptions {
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn with_effective_model(mut self, enabled: bool) -> Self {
        self.effective_model = enabled;
        self
    }

    pub fn with_active_profile(mut self, id: impl Into<String>) -> Self {
        self.active_profiles.push(id.into());
        self
    }

    pub fn with_inactive_profile(mut self, id: impl Into<String>) -> Self {
        self.inactive_profiles.push(id.into());
        self
    }

    pub fn with_user_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.insert(key.into(), value.into());
        self
    }

    /// Merges flags from the `.mvn/maven.config` governing `start`.
    ///
    /// Explicit options take precedence over the file.
    pub fn with_maven_config(mut self, start: &Path) -> Result<Self, WorkspaceError> {
        let Some(cli) = MavenCliOptions::discover(start)? else {
            return Ok(self);
        };
        for id in cli.active_profiles {
            if !self.active_profiles.contains(&id) && !self.inactive_profiles.contains(&id) {
                self.active_profiles.push(id);
            }
        }
        for id in cli.inactive_profiles {
            if !self.inactive_profiles.contains(&id) && !self.active_profiles.contains(&id) {
                self.inactive_profiles.push(id);
            }
        }
        for (key, value) in cli.user_properties {
            self.user_properties.entry(key).or_insert(value);
        }
        Ok(self)
    }

    /// Applies the `[maven]` table of a [`WorkspaceConfig`].
    pub fn with_config(mut self, config: &MavenConfig, config_dir: Option<&Path>) -> Self {
        if self.workspace_root.is_none() {
            self.workspace_root = config.workspace_root.as_ref().map(|root| match config_dir {
                Some(dir) if root.is_relative() => dir.join(root),
                _ => root.clone(),
            });
        }
        self.effective_model |= config.effective_model;
        for id in &config.active_profiles {
            if !self.active_profiles.contains(id) && !self.inactive_profiles.contains(id) {
                self.active_profiles.push(id.clone());
            }
        }
        for id in &config.inactive_profiles {
            if !self.inactive_profiles.contains(id) && !self.active_profiles.contains(id) {
                self.inactive_profiles.push(id.clone());
            }
        }
        for (key, value) in &config.properties {
            self.user_properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }
}

/// Profile and property flags read from `.mvn/maven.config`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MavenCliOptions {
    pub active_profiles: Vec<String>,
    pub inactive_profiles: Vec<String>,
    pub user_properties: BTreeMap<String, String>,
}

impl MavenCliOptions {
    /// Finds the top-most `.mvn` directory on `start`'s ancestor chain and parses its
    /// `maven.config`, mirroring how Maven picks the multi-module project directory.
    ///
    /// A relative `start` is resolved against the current directory first.
    pub fn discover(start: &Path) -> Result<Option<Self>, WorkspaceError> {
        let start = absolutize(start);
        let Some(config) = start
            .ancestors()
            .filter(|dir| dir.join(".mvn").is_dir())
            .last()
            .map(|dir| dir.join(".mvn").join("maven.config"))
            .filter(|config| config.is_file())
        else {
            return Ok(None);
        };

        let text = std::fs::read_to_string(&config).map_err(|source| WorkspaceError::Io {
            path: config.clone(),
            source,
        })?;
        tracing::debug!(
            target = "nova.maven",
            config = %config.display(),
            "applying .mvn/maven.config"
        );
        Ok(Some(Self::parse(&text)))
    }

    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();
        let mut tokens = text.split_whitespace();
        while let Some(token) = tokens.next() {
            if let Some(profiles) = token.strip_prefix("-P") {
                let profiles = if profiles.is_empty() {
                    tokens.next().unwrap_or_default()
                } else {
                    profiles
                };
                out.push_profiles(profiles);
            } else if token == "--activate-profiles" {
                out.push_profiles(tokens.next().unwrap_or_default());
            } else if let Some(profiles) = token.strip_prefix("--activate-profiles=") {
                out.push_profiles(profiles);
            } else if let Some(property) = token.strip_prefix("-D") {
                let property = if property.is_empty() {
                    tokens.next().unwrap_or_default()
                } else {
                    property
                };
                out.push_property(property);
            } else if token == "--define" {
                out.push_property(tokens.next().unwrap_or_default());
            }
        }
        out
    }

    fn push_profiles(&mut self, list: &str) {
        for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
            match id.strip_prefix('!').or_else(|| id.strip_prefix('-')) {
                Some(id) => self.inactive_profiles.push(id.to_string()),
                None => self.active_profiles.push(id.strip_prefix('+').unwrap_or(id).to_string()),
            }
        }
    }

    fn push_property(&mut self, property: &str) {
        if property.is_empty() {
            return;
        }
        // `-Dflag` defines `flag=true`, like Maven.
        let (key, value) = property.split_once('=').unwrap_or((property, "true"));
        self.user_properties.insert(key.to_string(), value.to_string());
    }
}

pub const NOVA_CONFIG_ENV_VAR: &str = "NOVA_CONFIG_PATH";

/// Contents of `nova.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub maven: MavenConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MavenConfig {
    /// Aggregator to load first; relative paths are resolved against the config file.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    #[serde(default)]
    pub effective_model: bool,
    #[serde(default)]
    pub active_profiles: Vec<String>,
    #[serde(default)]
    pub inactive_profiles: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    /// Filter built from `level`, with `RUST_LOG` appended when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let config_directives = Self::normalize_level_directives(&self.level);
        let fallback = || {
            tracing_subscriber::EnvFilter::try_new(&config_directives).unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::default()
                    .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
            })
        };

        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| fallback())
            }
            None => fallback(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl WorkspaceConfig {
    pub fn load_from_str(path: &Path, text: &str) -> Result<Self, WorkspaceError> {
        toml::from_str(text).map_err(|err| WorkspaceError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self, WorkspaceError> {
        let text = std::fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_str(path, &text)
    }
}

/// Finds the config file for `root`.
///
/// Search order:
/// 1) `NOVA_CONFIG_PATH` (absolute or relative to `root`)
/// 2) `nova.toml` in `root`
/// 3) `.nova.toml` in `root`
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(NOVA_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            root.join(candidate)
        };
        return Some(path);
    }

    ["nova.toml", ".nova.toml"]
        .into_iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Loads the config for `root`, or the defaults when there is none.
pub fn load_for_workspace(
    root: &Path,
) -> Result<(WorkspaceConfig, Option<PathBuf>), WorkspaceError> {
    let Some(path) = discover_config_path(root) else {
        return Ok((WorkspaceConfig::default(), None));
    };
    let config = WorkspaceConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber writing to stderr.
///
/// Only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let layer = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed()
        };
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init();
    });
}
