pub mod schema;

use std::io::Write;
use std::path::{Path, PathBuf};

pub use schema::{DisplayField, DisplaySet, Metric, Plan, PlanLimits, WidgetConfig};

use crate::error::ConfigError;

/// Environment variable selecting the plan when the config file has none.
pub const PLAN_ENV: &str = "CCM_PLAN";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CCM_CONFIG";

/// Backing storage for the widget config.
pub trait ConfigStore {
    /// Read the stored config. A missing file is `Ok(default)`.
    fn load(&self) -> Result<WidgetConfig, ConfigError>;

    fn save(&self, config: &WidgetConfig) -> Result<(), ConfigError>;
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// JSON file store, `~/.claude-monitor/widget-config.json` by default.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Checks `CCM_CONFIG` first, then falls back to the home directory.
    /// `None` when neither is available.
    pub fn from_env() -> Option<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(Self::new(path));
        }
        default_config_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `~/.claude-monitor/widget-config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude-monitor").join("widget-config.json"))
}

impl ConfigStore for FileStore {
    fn load(&self) -> Result<WidgetConfig, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(WidgetConfig::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    /// Serialize to a temp file next to the target, fsync, then rename over it.
    fn save(&self, config: &WidgetConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(config)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// A missing store behaves like an unreadable, unwritable file.
impl<S: ConfigStore> ConfigStore for Option<S> {
    fn load(&self) -> Result<WidgetConfig, ConfigError> {
        match self {
            Some(store) => store.load(),
            None => Err(ConfigError::NoHome),
        }
    }

    fn save(&self, config: &WidgetConfig) -> Result<(), ConfigError> {
        match self {
            Some(store) => store.save(config),
            None => Err(ConfigError::NoHome),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    inner: std::cell::RefCell<WidgetConfig>,
    pub saves: std::cell::Cell<usize>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with(config: WidgetConfig) -> Self {
        Self {
            inner: std::cell::RefCell::new(config),
            saves: std::cell::Cell::new(0),
        }
    }
}

#[cfg(test)]
impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<WidgetConfig, ConfigError> {
        Ok(self.inner.borrow().clone())
    }

    fn save(&self, config: &WidgetConfig) -> Result<(), ConfigError> {
        *self.inner.borrow_mut() = config.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Plan and display preferences on top of a [`ConfigStore`].
///
/// Nothing here fails: unreadable config means defaults, and a failed write
/// is logged and dropped.
pub struct Preferences<S> {
    store: S,
    env_plan: Option<String>,
}

impl<S: ConfigStore> Preferences<S> {
    pub fn new(store: S, env_plan: Option<String>) -> Self {
        Self { store, env_plan }
    }

    /// Uses `CCM_PLAN` as the environment override.
    pub fn from_env(store: S) -> Self {
        Self::new(store, std::env::var(PLAN_ENV).ok())
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn load(&self) -> WidgetConfig {
        match self.store.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("config unreadable, using defaults: {}", e);
                WidgetConfig::default()
            }
        }
    }

    fn save(&self, config: &WidgetConfig) {
        if let Err(e) = self.store.save(config) {
            tracing::warn!("failed to save config: {}", e);
        }
    }

    /// Stored plan, else the environment override, else `pro`.
    pub fn get_plan(&self) -> Plan {
        if let Some(plan) = self.load().plan() {
            return plan;
        }
        self.env_plan
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    /// Persist `id` if it names a known plan. Returns whether it did.
    pub fn set_plan(&self, id: &str) -> bool {
        let Ok(plan) = id.parse::<Plan>() else {
            tracing::debug!("ignoring unknown plan '{}'", id);
            return false;
        };
        let mut config = self.load();
        config.plan = Some(plan.id().to_string());
        self.save(&config);
        true
    }

    pub fn get_display(&self) -> DisplaySet {
        self.load().display()
    }

    /// Flip one title metric and persist the full toggle map.
    /// Returns whether `name` was a known metric.
    pub fn toggle_display(&self, name: &str) -> bool {
        let Ok(metric) = name.parse::<Metric>() else {
            tracing::debug!("ignoring unknown display metric '{}'", name);
            return false;
        };
        let mut config = self.load();
        let mut display = config.display();
        display.toggle(metric);
        config.display = Some(DisplayField::Map(display.to_map()));
        self.save(&config);
        true
    }
}
