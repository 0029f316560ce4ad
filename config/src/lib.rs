//! Harness configuration.
//!
//! ```toml
//! [server]
//! command = "solc"
//! args = ["--lsp"]
//! language_id = "Solidity"
//! shutdown_timeout_ms = 2000
//! diagnostics_timeout_ms = 0
//!
//! [suite]
//! project_root = "."
//! fixtures_dir = "fixtures/lsp"
//! fixture_extension = "sol"
//! test_pattern = "*"
//! fail_fast = false
//! trace_io = false
//! print_assertions = false
//! ```
//!
//! Every key is optional. Command-line flags are merged on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

const LOCAL_CONFIG_FILE: &str = "lspcheck.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} does not exist", path.display())]
    NotFound { path: PathBuf },
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::NotFound { path }
            | ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub server: ServerConfig,
    pub suite: SuiteConfig,
}

/// The language server under test.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Program path, or a bare name looked up on `PATH`.
    pub command: String,
    pub args: Vec<String>,
    /// `languageId` sent with every opened document.
    pub language_id: String,
    /// How long teardown waits for the killed server to exit.
    pub shutdown_timeout_ms: u64,
    /// Upper bound for one diagnostics wait. `0` waits indefinitely.
    pub diagnostics_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: "solc".to_string(),
            args: vec!["--lsp".to_string()],
            language_id: "Solidity".to_string(),
            shutdown_timeout_ms: 2000,
            diagnostics_timeout_ms: 0,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    #[must_use]
    pub const fn diagnostics_timeout(&self) -> Option<Duration> {
        if self.diagnostics_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.diagnostics_timeout_ms))
        }
    }

    fn expand_env(&mut self) {
        self.command = expand_env_vars(&self.command);
        self.language_id = expand_env_vars(&self.language_id);
        for arg in &mut self.args {
            *arg = expand_env_vars(arg);
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    pub project_root: PathBuf,
    /// Fixture directory, relative to `project_root` unless absolute.
    pub fixtures_dir: PathBuf,
    pub fixture_extension: String,
    /// Glob over bare test names.
    pub test_pattern: String,
    pub fail_fast: bool,
    pub trace_io: bool,
    pub print_assertions: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            fixtures_dir: PathBuf::from("fixtures/lsp"),
            fixture_extension: "sol".to_string(),
            test_pattern: "*".to_string(),
            fail_fast: false,
            trace_io: false,
            print_assertions: false,
        }
    }
}

impl SuiteConfig {
    /// The fixture directory resolved against the project root.
    #[must_use]
    pub fn fixtures_path(&self) -> PathBuf {
        self.project_root.join(&self.fixtures_dir)
    }
}

impl HarnessConfig {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, the first existing file
    /// among [`default_paths`] is used, and defaults apply if none exists.
    /// Returns the path that was read, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Ok((Self::from_path(path)?, Some(path.to_path_buf())))
            }
            None => Self::load_first(&default_paths()),
        }
    }

    /// Read the first existing file among `candidates`.
    pub fn load_first(candidates: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Ok((Self::from_path(path)?, Some(path.clone()))),
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::parse(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Parse TOML text and expand `${VAR}` references in `[server]`.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.server.expand_env();
        Ok(config)
    }
}

/// Lookup order when no explicit path is given.
#[must_use]
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("lspcheck").join("config.toml"));
    }
    paths
}

/// Replace `${VAR}` with the variable's value.
///
/// Unset variables expand to nothing. An unterminated `${` is kept as is.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}
