//! Bridge configuration.
//!
//! Loaded from a TOML file; every key is optional.
//!
//! ```toml
//! python = "/usr/bin/python3"
//! package = "pyflowchart"
//! index_url = "https://pypi.org/simple"
//! prefer_installed = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ConfigError;

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_PACKAGE: &str = "pyflowchart";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Interpreter executable.
    pub python: PathBuf,
    /// Package installed during runtime setup.
    pub package: String,
    /// Alternate package index for installs.
    pub index_url: Option<String>,
    /// Skip the install when the package already imports.
    pub prefer_installed: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from(DEFAULT_PYTHON),
            package: DEFAULT_PACKAGE.to_string(),
            index_url: None,
            prefer_installed: true,
        }
    }
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub python: Option<PathBuf>,
    pub package: Option<String>,
    pub index_url: Option<String>,
}

impl BridgeConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(python) = overrides.python {
            self.python = python;
        }
        if let Some(package) = overrides.package {
            self.package = package;
        }
        if overrides.index_url.is_some() {
            self.index_url = overrides.index_url;
        }
        self
    }
}
