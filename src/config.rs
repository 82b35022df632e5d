//! Optional `lutgen.toml` configuration.
//!
//! Lookup order:
//! 1. `LUTGEN_CONFIG` environment variable
//! 2. `lutgen.toml` in the model's directory or any ancestor
//!
//! Command-line flags override whatever the file sets.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::emit::Dialect;
use crate::error::{GenError, GenResult};
use crate::output::OutputLayout;
use crate::pipeline::GenerateOptions;

pub const CONFIG_FILE: &str = "lutgen.toml";
pub const CONFIG_ENV: &str = "LUTGEN_CONFIG";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output: OutputSection,
    pub generate: GenerateSection,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub root: PathBuf,
    pub vhdl_dir: String,
    pub sv_dir: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        let layout = OutputLayout::default();
        Self {
            root: layout.root,
            vhdl_dir: layout.vhdl_dir,
            sv_dir: layout.sv_dir,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateSection {
    pub dialects: Vec<String>,
    /// Layers with at least this many neurons are extracted in parallel.
    pub parallel_threshold: usize,
}

impl Default for GenerateSection {
    fn default() -> Self {
        Self {
            dialects: Dialect::ALL.iter().map(|d| d.name().to_string()).collect(),
            parallel_threshold: 256,
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> GenResult<Config> {
        toml::from_str(source).map_err(|e| GenError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> GenResult<Config> {
        let source = std::fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        Config::from_toml(&source).map_err(|e| match e {
            GenError::Config(msg) => GenError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Locate a config file for a model living in `start_dir`.
    pub fn find(start_dir: &Path) -> GenResult<Option<PathBuf>> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            if !path.exists() {
                return Err(GenError::Config(format!(
                    "{} points to missing file '{}'",
                    CONFIG_ENV,
                    path.display()
                )));
            }
            return Ok(Some(path));
        }
        Ok(Self::find_in_ancestors(start_dir))
    }

    pub fn find_in_ancestors(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Find and load the config for `start_dir`, or fall back to defaults.
    pub fn discover(start_dir: &Path) -> GenResult<Config> {
        match Self::find(start_dir)? {
            Some(path) => {
                tracing::debug!("using config {}", path.display());
                Config::load(&path)
            }
            None => Ok(Config::default()),
        }
    }

    /// Requested dialects in order, duplicates removed.
    pub fn dialects(&self) -> GenResult<Vec<Dialect>> {
        parse_dialects(&self.generate.dialects)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            root: self.output.root.clone(),
            vhdl_dir: self.output.vhdl_dir.clone(),
            sv_dir: self.output.sv_dir.clone(),
        }
    }

    pub fn options(&self) -> GenResult<GenerateOptions> {
        Ok(GenerateOptions {
            name: None,
            dialects: self.dialects()?,
            parallel_threshold: self.generate.parallel_threshold,
        })
    }
}

/// Parse dialect names, keeping first occurrences in order.
pub fn parse_dialects<S: AsRef<str>>(names: &[S]) -> GenResult<Vec<Dialect>> {
    let mut dialects = Vec::new();
    for name in names {
        let name = name.as_ref();
        let dialect = Dialect::parse(name).ok_or_else(|| {
            GenError::Config(format!(
                "unknown dialect '{}' (expected vhdl or sv)",
                name
            ))
        })?;
        if !dialects.contains(&dialect) {
            dialects.push(dialect);
        }
    }
    if dialects.is_empty() {
        return Err(GenError::Config("no output dialect selected".to_string()));
    }
    Ok(dialects)
}
