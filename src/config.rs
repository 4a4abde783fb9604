use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

const DEMO_SECTION: &str = "demo";
const CHAT_SECTION: &str = "chat";
const AI_SECTION: &str = "ai";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config path '{}': {reason}", .path.display())]
    Path { path: PathBuf, reason: String },

    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed YAML in '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "config '{}' failed validation:\n  {}",
        .path.display(),
        .violations.join("\n  ")
    )]
    Schema {
        path: PathBuf,
        violations: Vec<String>,
    },
}

impl ConfigError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path { .. } => "path",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
            Self::Schema { .. } => "schema",
        }
    }
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    pub token: String,
    pub channel: String,
    pub prefix: String,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("token", &"<redacted>")
            .field("channel", &self.channel)
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub personality: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Sliding-window cap on the AI history. `None` keeps every message.
    #[serde(default)]
    pub max_history: Option<usize>,
}

impl AiConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_AI_TIMEOUT_SECS)
    }
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("personality", &self.personality)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_history", &self.max_history)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    pub chat: ChatConfig,
    pub ai: AiConfig,
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    pub message: String,
    pub token: String,
    pub channel: String,
}

impl fmt::Debug for DemoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoConfig")
            .field("message", &self.message)
            .field("token", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DemoFile {
    demo: DemoConfig,
}

/// A validated configuration file. The presence of a top-level `demo` key
/// selects the demo variant.
#[derive(Debug, Clone, PartialEq)]
pub enum AppConfig {
    Demo(DemoConfig),
    Bot(BotConfig),
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "validating config path");
        check_path(path)?;

        debug!(path = %path.display(), "reading config file");
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&raw, path)
    }

    fn from_yaml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty file is a document with no mapping, not a syntax error.
        let value: Value = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        debug!(path = %path.display(), "validating config schema");
        let violations = schema_violations(&value);
        if !violations.is_empty() {
            return Err(ConfigError::Schema {
                path: path.to_path_buf(),
                violations,
            });
        }

        let schema_error = |err: serde_yaml::Error| ConfigError::Schema {
            path: path.to_path_buf(),
            violations: vec![err.to_string()],
        };

        if value.get(DEMO_SECTION).is_some() {
            serde_yaml::from_value::<DemoFile>(value)
                .map(|file| Self::Demo(file.demo))
                .map_err(schema_error)
        } else {
            serde_yaml::from_value::<BotConfig>(value)
                .map(Self::Bot)
                .map_err(schema_error)
        }
    }
}

fn check_path(path: &Path) -> Result<(), ConfigError> {
    let path_error = |reason: String| ConfigError::Path {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = fs::metadata(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => path_error("file does not exist".to_string()),
        _ => path_error(err.to_string()),
    })?;

    if !metadata.is_file() {
        return Err(path_error("not a regular file".to_string()));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldKind {
    Str,
    Float,
    PositiveInt,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Str => value.is_string(),
            Self::Float => value.as_f64().is_some(),
            Self::PositiveInt => value.as_u64().is_some_and(|n| n > 0),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Str => "a string",
            Self::Float => "a number",
            Self::PositiveInt => "a positive integer",
        }
    }
}

struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    required: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

const DEMO_FIELDS: &[FieldSpec] = &[
    required("message", FieldKind::Str),
    required("token", FieldKind::Str),
    required("channel", FieldKind::Str),
];

const CHAT_FIELDS: &[FieldSpec] = &[
    required("token", FieldKind::Str),
    required("channel", FieldKind::Str),
    required("prefix", FieldKind::Str),
];

const AI_FIELDS: &[FieldSpec] = &[
    required("base_url", FieldKind::Str),
    required("api_key", FieldKind::Str),
    required("model", FieldKind::Str),
    required("temperature", FieldKind::Float),
    required("personality", FieldKind::Str),
    optional("timeout_secs", FieldKind::PositiveInt),
    optional("max_history", FieldKind::PositiveInt),
];

/// Collects every schema problem in the document instead of stopping at the
/// first one, so a single run reports all fields that need fixing.
fn schema_violations(value: &Value) -> Vec<String> {
    let mut violations = Vec::new();

    let Some(root) = value.as_mapping() else {
        violations.push("expected a mapping at the top level".to_string());
        return violations;
    };

    let sections: &[(&str, &[FieldSpec])] = if root.get(DEMO_SECTION).is_some() {
        &[(DEMO_SECTION, DEMO_FIELDS)]
    } else {
        &[(CHAT_SECTION, CHAT_FIELDS), (AI_SECTION, AI_FIELDS)]
    };

    for (key, _) in root.iter() {
        let known = key
            .as_str()
            .is_some_and(|name| sections.iter().any(|(section, _)| *section == name));
        if !known {
            violations.push(format!("{}: unknown field", key_label(key)));
        }
    }

    for (section, fields) in sections {
        match root.get(*section) {
            None => violations.push(format!("{section}: missing required section")),
            Some(Value::Mapping(mapping)) => {
                check_section(section, mapping, fields, &mut violations)
            }
            Some(_) => violations.push(format!("{section}: expected a mapping")),
        }
    }

    violations
}

fn check_section(
    section: &str,
    mapping: &Mapping,
    fields: &[FieldSpec],
    violations: &mut Vec<String>,
) {
    for field in fields {
        match mapping.get(field.name) {
            None if field.required => {
                violations.push(format!("{section}.{}: missing required field", field.name))
            }
            None => {}
            Some(value) if !field.kind.accepts(value) => violations.push(format!(
                "{section}.{}: expected {}",
                field.name,
                field.kind.describe()
            )),
            Some(_) => {}
        }
    }

    for (key, _) in mapping.iter() {
        let known = key
            .as_str()
            .is_some_and(|name| fields.iter().any(|field| field.name == name));
        if !known {
            violations.push(format!("{section}.{}: unknown field", key_label(key)));
        }
    }
}

fn key_label(key: &Value) -> String {
    match key.as_str() {
        Some(name) => name.to_string(),
        None => serde_yaml::to_string(key)
            .map(|rendered| rendered.trim().to_string())
            .unwrap_or_else(|_| "<non-string key>".to_string()),
    }
}
