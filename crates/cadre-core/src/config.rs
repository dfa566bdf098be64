//! Configuration
//!
//! Orchestrator, scheduler and team settings. Files are read as TOML or JSON
//! depending on the extension. Team configs additionally support environment
//! placeholders: a string value that is exactly `${VAR}` or `${VAR:default}`
//! is replaced before deserialisation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::types::Metadata;

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Tasks kept for status queries before the oldest are evicted (0 = unbounded)
    pub task_store_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            task_store_capacity: 10_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_store_capacity(mut self, capacity: usize) -> Self {
        self.task_store_capacity = capacity;
        self
    }
}

/// Recurring task engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Poll loop period in milliseconds
    pub tick_interval_ms: u64,

    /// History entries kept (0 = unbounded)
    pub history_capacity: usize,

    /// How long `stop` waits for the poll loop to exit
    pub stop_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            history_capacity: 1000,
            stop_timeout_secs: 5,
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_stop_timeout_secs(mut self, secs: u64) -> Self {
        self.stop_timeout_secs = secs;
        self
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = serde_json::from_value(read_value(path.as_ref())?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// One team member: a worker kind instantiated under a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberConfig {
    pub name: String,

    /// Worker kind registered with the team factory, e.g. `echo`
    pub kind: String,

    /// Task types this member accepts
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Kind-specific settings
    #[serde(default)]
    pub config: Metadata,
}

impl MemberConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            capabilities: Vec::new(),
            config: Metadata::new(),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_config(mut self, config: Metadata) -> Self {
        self.config = config;
        self
    }
}

/// A team description, as read by the team factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Registered team type, e.g. `bakery`
    pub team_type: String,

    /// Playbook settings such as `bakery_name`
    #[serde(default)]
    pub settings: Metadata,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

impl TeamConfig {
    pub fn new(team_type: impl Into<String>) -> Self {
        Self {
            team_type: team_type.into(),
            settings: Metadata::new(),
            orchestrator: OrchestratorConfig::default(),
            members: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: Metadata) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_member(mut self, member: MemberConfig) -> Self {
        self.members.push(member);
        self
    }

    /// Load from a `.toml` or `.json` file, substituting environment placeholders
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = read_value(path.as_ref())?;
        let resolved = substitute_env(raw, &|name: &str| std::env::var(name).ok());
        Ok(serde_json::from_value(resolved)?)
    }

    /// Parse a JSON document without touching the environment
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parse a config file into a JSON value, choosing the format by extension
fn read_value(path: &Path) -> Result<Value> {
    let display = path.display().to_string();
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if format != "toml" && format != "json" {
        return Err(ConfigError::UnsupportedFormat(display).into());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;

    let value = if format == "toml" {
        let table: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?;
        serde_json::to_value(table)?
    } else {
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: display,
            message: e.to_string(),
        })?
    };
    Ok(value)
}

/// Replace `${VAR}` / `${VAR:default}` string values, recursively.
///
/// Unset variables without a default become the empty string. Only whole
/// string values are placeholders; text around a `${...}` is left alone.
pub fn substitute_env(value: Value, lookup: &dyn Fn(&str) -> Option<String>) -> Value {
    match value {
        Value::String(s) => {
            let replaced = placeholder(&s).map(|(name, default)| {
                lookup(name).unwrap_or_else(|| default.unwrap_or_default().to_string())
            });
            Value::String(replaced.unwrap_or(s))
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute_env(item, lookup))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute_env(v, lookup)))
                .collect(),
        ),
        other => other,
    }
}

fn placeholder(s: &str) -> Option<(&str, Option<&str>)> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    Some(match inner.split_once(':') {
        Some((name, default)) => (name, Some(default)),
        None => (inner, None),
    })
}
