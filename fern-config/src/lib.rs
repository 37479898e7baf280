//! Loader for client configuration with YAML + environment overlays.
//!
//! `fern.yaml` names the instance to talk to and feed preferences;
//! `FERN_`-prefixed environment variables override file values and `${VAR}`
//! placeholders are expanded recursively before deserialisation.
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct FernConfig {
    pub version: Option<String>,
    pub instance: InstanceConfig,
    #[serde(default)]
    pub feed: FeedPrefs,
}

/// Which server to talk to and as whom.
#[derive(Debug, Deserialize)]
pub struct InstanceConfig {
    /// Base URL of the instance, e.g. `https://example.social`.
    pub server: String,
    pub access_token: String,
}

/// Preferences applied when building feeds.
#[derive(Debug, Default, Deserialize)]
pub struct FeedPrefs {
    /// Notification kinds excluded from the notification feed. Passed to
    /// the server unchanged as `exclude_types[]`.
    #[serde(default)]
    pub hide_notifications: Vec<NotificationKind>,
}

/// One notification type as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Mention,
    Status,
    #[serde(rename = "reblog")]
    Boost,
    Follow,
    FollowRequest,
    #[serde(rename = "favourite")]
    Favorite,
    Poll,
    #[serde(rename = "update")]
    Edit,
}

impl NotificationKind {
    /// The wire name the remote service uses for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Mention => "mention",
            NotificationKind::Status => "status",
            NotificationKind::Boost => "reblog",
            NotificationKind::Follow => "follow",
            NotificationKind::FollowRequest => "follow_request",
            NotificationKind::Favorite => "favourite",
            NotificationKind::Poll => "poll",
            NotificationKind::Edit => "update",
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct FernConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for FernConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FernConfigLoader {
    /// Start with sensible defaults: YAML file + `FERN_` env overrides.
    ///
    /// ```
    /// use fern_config::FernConfigLoader;
    ///
    /// let config = FernConfigLoader::new()
    ///     .with_yaml_str(
    ///         "instance:\n  server: https://example.social\n  access_token: token\n",
    ///     )
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.instance.server, "https://example.social");
    /// assert!(config.feed.hide_notifications.is_empty());
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("FERN").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use fern_config::{FernConfigLoader, NotificationKind};
    ///
    /// unsafe { std::env::set_var("FEED_TOKEN", "injected-from-env"); }
    ///
    /// let config = FernConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// instance:
    ///   server: "https://example.social"
    ///   access_token: "${FEED_TOKEN}"
    /// feed:
    ///   hide_notifications: ["reblog", "follow_request"]
    /// "#,
    ///     )
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.instance.access_token, "injected-from-env");
    /// assert_eq!(
    ///     config.feed.hide_notifications,
    ///     vec![NotificationKind::Boost, NotificationKind::FollowRequest]
    /// );
    ///
    /// unsafe { std::env::remove_var("FEED_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<FernConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: FernConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
