use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use taskmaster_core::schema::{FilterType, SortDirection, SortType};

use crate::task_query::TaskQuery;

const CONFIG_DIR: &str = ".taskmaster";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `[view].filter`.
pub const FILTER_ENV: &str = "TASKMASTER_FILTER";
/// Environment variable overriding `[view].sort`.
pub const SORT_ENV: &str = "TASKMASTER_SORT";

/// Top-level project configuration loaded from `.taskmaster/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// `[view]` table.
    #[serde(default)]
    pub view: ViewConfig,
    /// `[data]` table.
    #[serde(default)]
    pub data: DataConfig,
    #[serde(skip)]
    root: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load configuration from the nearest ancestor of `cwd` that has a
    /// `.taskmaster` directory, falling back to defaults rooted at `cwd`.
    pub fn load(cwd: impl AsRef<Path>) -> Result<Self> {
        let cwd = cwd.as_ref();
        let workdir = cwd
            .ancestors()
            .find(|dir| dir.join(CONFIG_DIR).is_dir())
            .unwrap_or(cwd);
        Self::from_workdir(workdir)
    }

    /// Load configuration from a known working directory, applying the
    /// process environment overrides.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        Self::from_workdir_with_env(workdir, |key| std::env::var(key).ok())
    }

    /// Load configuration from a known working directory with an explicit
    /// environment lookup.
    pub fn from_workdir_with_env(
        workdir: impl AsRef<Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let workdir = workdir.as_ref();
        let config_path = workdir.join(CONFIG_DIR).join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            toml::from_str::<Self>(&contents)
                .with_context(|| format!("failed to parse {}", config_path.display()))?
        } else {
            Self::default()
        };
        config.root = Some(workdir.to_path_buf());
        config.view.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Seed file resolved against the directory the configuration came from.
    pub fn seed_path(&self) -> Option<PathBuf> {
        let seed = self.data.seed.as_ref()?;
        Some(match &self.root {
            Some(root) if seed.is_relative() => root.join(seed),
            _ => seed.clone(),
        })
    }

    fn validate(&self) -> Result<()> {
        self.data.ensure_valid_seed()
    }
}

/// Default listing parameters.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    /// Which tasks to list; `all` when unset.
    #[serde(default)]
    pub filter: FilterType,
    /// Listing sort key; `created` when unset.
    #[serde(default)]
    pub sort: SortType,
    /// Overrides the natural direction of `sort` when set.
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

impl ViewConfig {
    /// Query reflecting these defaults.
    pub fn query(&self) -> TaskQuery {
        let query = TaskQuery::new().with_filter(self.filter).with_sort(self.sort);
        match self.direction {
            Some(direction) => query.with_direction(direction),
            None => query,
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = env(FILTER_ENV) {
            self.filter = raw
                .trim()
                .parse::<FilterType>()
                .with_context(|| format!("invalid {FILTER_ENV}"))?;
        }
        if let Some(raw) = env(SORT_ENV) {
            self.sort = raw
                .trim()
                .parse::<SortType>()
                .with_context(|| format!("invalid {SORT_ENV}"))?;
        }
        Ok(())
    }
}

/// Data source settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// JSON array of storage records used to seed the in-memory remote.
    #[serde(default)]
    pub seed: Option<PathBuf>,
}

impl DataConfig {
    fn ensure_valid_seed(&self) -> Result<()> {
        if self
            .seed
            .as_ref()
            .is_some_and(|seed| seed.as_os_str().is_empty())
        {
            bail!("data.seed must not be empty");
        }
        Ok(())
    }
}
