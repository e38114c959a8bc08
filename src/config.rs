use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::layout::{Direction, LayoutConfig};

/// Default time the TUI waits for input before checking for file changes.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub layout: LayoutSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    /// `LR` or `TB`.
    pub direction: Option<String>,
    /// Milliseconds.
    pub poll_interval: Option<u64>,
}

/// Node box size and spacing; unset keys keep the built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutSection {
    pub node_width: Option<f64>,
    pub node_height: Option<f64>,
    pub rank_sep: Option<f64>,
    pub node_sep: Option<f64>,
    pub edge_sep: Option<f64>,
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".depflow").join("config.toml")
}

impl Config {
    /// Load from `path`, or `~/.depflow/config.toml` when not given.
    /// A missing file yields the default config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(p),
            None => Self::load_from(&default_config_path()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(d) = &self.view.direction {
            Direction::parse(d).with_context(|| format!("failed to parse {}", path.display()))?;
        }
        if self.view.poll_interval == Some(0) {
            bail!("failed to parse {}: view.poll_interval must be positive", path.display());
        }
        self.layout_config()
            .validate()
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn direction(&self) -> Result<Direction> {
        match &self.view.direction {
            Some(d) => Direction::parse(d),
            None => Ok(Direction::default()),
        }
    }

    pub fn poll_interval(&self) -> u64 {
        self.view.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_MS)
    }

    pub fn layout_config(&self) -> LayoutConfig {
        let d = LayoutConfig::default();
        let l = &self.layout;
        LayoutConfig {
            node_width: l.node_width.unwrap_or(d.node_width),
            node_height: l.node_height.unwrap_or(d.node_height),
            rank_sep: l.rank_sep.unwrap_or(d.rank_sep),
            node_sep: l.node_sep.unwrap_or(d.node_sep),
            edge_sep: l.edge_sep.unwrap_or(d.edge_sep),
        }
    }
}
