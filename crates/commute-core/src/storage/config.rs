//! TOML-based commute configuration.
//!
//! Stores:
//! - Home and work addresses, plus optional detour hints per direction
//! - Working hours and the arrival buffer
//! - Gazetteer keyword lists for the distance heuristic
//! - Engine tuning (jitter policy, seed, baseline round trip, weather)
//! - Refresh interval for `commute watch`
//!
//! Configuration is stored at `~/.config/commute/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::congestion::RouteHint;
use crate::error::{ConfigError, ScheduleError};
use crate::jitter::DistanceJitter;
use crate::location::{CommuteRoute, Gazetteer, LocationDescriptor};
use crate::schedule::WorkSchedule;

/// Where the commute starts and ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteConfig {
    /// Home address; empty means unknown
    #[serde(default)]
    pub home: String,
    /// Work address; empty means unknown
    #[serde(default)]
    pub work: String,
    /// Detour suggested on a heavy outbound leg; empty disables it
    #[serde(default)]
    pub outbound_alternative: String,
    #[serde(default = "default_outbound_extra")]
    pub outbound_alternative_minutes: u32,
    /// Detour suggested on a heavy return leg; empty disables it
    #[serde(default)]
    pub return_alternative: String,
    #[serde(default = "default_return_extra")]
    pub return_alternative_minutes: u32,
}

/// Working hours as `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_end")]
    pub end: String,
    #[serde(default = "default_buffer")]
    pub buffer_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub jitter_policy: DistanceJitter,
    /// Fixed seed for reproducible jitter.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Free-flow round trip in minutes
    #[serde(default = "default_baseline_total")]
    pub baseline_total: u32,
    /// When off, weather passed on the command line is ignored.
    #[serde(default = "default_true")]
    pub weather_integration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval")]
    pub interval_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/commute/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub commute: CommuteConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub gazetteer: Gazetteer,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

fn default_outbound_extra() -> u32 {
    8
}
fn default_return_extra() -> u32 {
    12
}
fn default_start() -> String {
    "09:00".into()
}
fn default_end() -> String {
    "18:00".into()
}
fn default_buffer() -> i32 {
    5
}
fn default_baseline_total() -> u32 {
    73
}
fn default_true() -> bool {
    true
}
fn default_interval() -> u32 {
    5
}

impl Default for CommuteConfig {
    fn default() -> Self {
        Self {
            home: String::new(),
            work: String::new(),
            outbound_alternative: String::new(),
            outbound_alternative_minutes: default_outbound_extra(),
            return_alternative: String::new(),
            return_alternative_minutes: default_return_extra(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            end: default_end(),
            buffer_minutes: default_buffer(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jitter_policy: DistanceJitter::default(),
            seed: None,
            baseline_total: default_baseline_total(),
            weather_integration: true,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset optional: accept any JSON literal, else a string
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// The schedule section is re-validated so an inverted or negative
    /// schedule is rejected here rather than at estimate time.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated
            .work_schedule()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        *self = updated;
        Ok(())
    }

    /// [`apply`](Self::apply) and save to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Every leaf key with its value, in dot-path form.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            flatten("", &json, &mut out);
        }
        out
    }

    pub fn work_schedule(&self) -> Result<WorkSchedule, ScheduleError> {
        WorkSchedule::parse(
            &self.schedule.start,
            &self.schedule.end,
            self.schedule.buffer_minutes,
        )
    }

    /// Home and work as descriptors; unset addresses become labels.
    pub fn route(&self) -> CommuteRoute {
        let describe = |text: &str, label: &str| {
            if text.trim().is_empty() {
                LocationDescriptor::label(label)
            } else {
                LocationDescriptor::address(text.trim())
            }
        };
        CommuteRoute::new(
            describe(&self.commute.home, "home"),
            describe(&self.commute.work, "work"),
        )
    }

    /// Configured detour hints as `(outbound, return)`.
    pub fn route_hints(&self) -> (Option<RouteHint>, Option<RouteHint>) {
        let hint = |label: &str, extra_minutes: u32| {
            (!label.trim().is_empty()).then(|| RouteHint {
                label: label.trim().to_string(),
                extra_minutes,
            })
        };
        (
            hint(
                &self.commute.outbound_alternative,
                self.commute.outbound_alternative_minutes,
            ),
            hint(
                &self.commute.return_alternative,
                self.commute.return_alternative_minutes,
            ),
        )
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
