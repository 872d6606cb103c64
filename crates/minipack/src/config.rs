//! Build configuration.
//!
//! Loaded once from `minipack.toml` and immutable for the run. Plugins
//! and loaders are code, so the file carries only data: the entry
//! module, the output location, and the ordered loader rules.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::errors::BundleError;

/// Top-level configuration consumed by the compiler.
///
/// ```toml
/// entry = "./src/index.py"
///
/// [output]
/// path = "dist"
/// filename = "bundle.py"
///
/// [[module.rules]]
/// test = "\\.py$"
/// use = { loader = "banner", options = { text = "built with minipack" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Entry module path, relative to the project root.
    pub entry: String,
    pub output: OutputConfig,
    #[serde(default)]
    pub module: ModuleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Output directory, relative to the project root.
    pub path: PathBuf,
    pub filename: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Pairs a path predicate with the loaders to apply. Rules are consulted
/// in declaration order and the first match wins.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub test: PathPattern,
    #[serde(rename = "use")]
    pub use_: LoaderUse,
}

/// A regex matched against a module's absolute path, compiled at
/// configuration load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct PathPattern(Regex);

impl PathPattern {
    pub fn is_match(&self, path: &Path) -> bool {
        self.0.is_match(&path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PathPattern {
    type Error = regex::Error;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Regex::new(&pattern).map(Self)
    }
}

/// The three accepted shapes of a rule's `use` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LoaderUse {
    /// A single loader, invoked without options.
    Single(String),
    /// An ordered chain; the last declared loader runs first.
    Chain(Vec<String>),
    /// A single loader with an options payload.
    Descriptor {
        loader: String,
        options: Option<toml::Table>,
    },
}

impl LoaderUse {
    /// Names of every loader this `use` references, in declaration order.
    pub fn loader_names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Chain(names) => names.iter().map(String::as_str).collect(),
            Self::Descriptor { loader, .. } => vec![loader.as_str()],
        }
    }
}

impl Config {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BundleError::Config(format!("cannot read `{}`: {err}", path.display()))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|err| {
            BundleError::Config(format!("cannot parse `{}`: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BundleError> {
        if self.entry.trim().is_empty() {
            return Err(BundleError::Config("`entry` must not be empty".to_string()));
        }
        if self.output.filename.trim().is_empty() {
            return Err(BundleError::Config(
                "`output.filename` must not be empty".to_string(),
            ));
        }
        for (index, rule) in self.module.rules.iter().enumerate() {
            if let LoaderUse::Chain(names) = &rule.use_
                && names.is_empty()
            {
                return Err(BundleError::Config(format!(
                    "rule #{index} (test `{}`) declares an empty loader chain",
                    rule.test.as_str()
                )));
            }
        }
        Ok(())
    }
}
