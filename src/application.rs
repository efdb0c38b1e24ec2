//! # Application Descriptor Resolution
//!
//! Turns the rendered output of an app-of-apps chart into validated
//! [`Application`] descriptors. The input is a byte stream holding any number
//! of YAML documents; only Argo CD `Application` resources are kept.
//!
//! The metadata on an Application is loosely structured and frequently
//! redundant. A single descriptor is resolved from:
//!
//! - **Labels**: `instance` and `env`.
//! - **Annotations**: `rawRepository` and `rawPath`, which take priority over
//!   the matching `spec.source` fields.
//! - **Plugin environment**: `WERF_SET_INSTANCE` / `WERF_SET_ENV` (identity),
//!   `WERF_VALUES_<N>` (ordered values files) and any `WERF_SET_*` variable of
//!   the form `key=value` (setters).
//!
//! Resolution is pure: no I/O, no shared state. Recoverable oddities are
//! logged as warnings, while malformed YAML, conflicting identity values and a
//! missing repository fail the whole call.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

/// `apiVersion` of the resources that are resolved.
pub const APPLICATION_API_VERSION: &str = "argoproj.io/v1alpha1";
/// `kind` of the resources that are resolved.
pub const APPLICATION_KIND: &str = "Application";

const INSTANCE_LABEL: &str = "instance";
const ENV_LABEL: &str = "env";
const RAW_REPOSITORY_ANNOTATION: &str = "rawRepository";
const RAW_PATH_ANNOTATION: &str = "rawPath";

const INSTANCE_VAR: &str = "WERF_SET_INSTANCE";
const ENV_VAR: &str = "WERF_SET_ENV";
const SETTER_PREFIX: &str = "WERF_SET_";
const VALUES_FILE_PREFIX: &str = "WERF_VALUES_";

const DEFAULT_PATH: &str = ".";

/// A name/value pair from `spec.source.plugin.env`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvVar {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub name: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub value: String,
}

impl EnvVar {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// A resolved child application, ready to be cloned and rendered.
///
/// `name` and `repo_url` are never empty. `instance` and `env` are empty when
/// no source supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub instance: String,
    pub env: String,
    pub repo_url: String,
    pub path: String,
    pub target_revision: String,
    /// Plugin variables not consumed as instance, env or values-file directives.
    pub plugin_env: Vec<EnvVar>,
    /// Values files relative to the application path, ordered by their index.
    pub values_files: Vec<String>,
    /// `--set` overrides collected from `WERF_SET_*` variables.
    pub setters: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApplication {
    #[serde(default, deserialize_with = "null_as_default")]
    metadata: RawMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    spec: RawSpec,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default, deserialize_with = "scalar_as_string")]
    name: String,
    #[serde(default, deserialize_with = "scalar_map")]
    labels: HashMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map")]
    annotations: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    source: RawSource,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSource {
    #[serde(default, deserialize_with = "scalar_as_string")]
    repo_url: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    target_revision: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    path: String,
    #[serde(default)]
    plugin: Option<RawPlugin>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlugin {
    #[serde(default, deserialize_with = "null_as_default")]
    env: Vec<EnvVar>,
}

/// Treats an explicit YAML `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads any YAML scalar as its text, so `1.0` or `true` stay usable as strings.
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
    scalar_text(value).map_err(D::Error::custom)
}

/// A string map whose keys and values may be any YAML scalar.
fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Mapping>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| Ok((scalar_text(key)?, scalar_text(value)?)))
        .collect::<std::result::Result<_, String>>()
        .map_err(D::Error::custom)
}

/// Text of a scalar; `null` is empty. Sequences and mappings are rejected.
fn scalar_text(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        Value::Tagged(tagged) => scalar_text(tagged.value),
        Value::Sequence(_) => Err("invalid type: sequence, expected a scalar".to_string()),
        Value::Mapping(_) => Err("invalid type: map, expected a scalar".to_string()),
    }
}

/// Parses every Application in a multi-document YAML stream.
///
/// Documents of any other kind are skipped. Output order follows document
/// order. A malformed document or an invalid Application anywhere in the
/// stream fails the whole call.
pub fn parse_applications(yaml_data: &[u8]) -> Result<Vec<Application>> {
    let mut applications = Vec::new();

    for document in serde_yaml::Deserializer::from_slice(yaml_data) {
        let value = Value::deserialize(document).map_err(Error::YamlDecode)?;
        if !is_application(&value) {
            continue;
        }

        let raw: RawApplication = serde_yaml::from_value(value).map_err(Error::YamlDecode)?;
        let name = raw.metadata.name.clone();
        let application = resolve(raw).map_err(|e| Error::invalid_application(&name, e))?;
        applications.push(application);
    }

    Ok(applications)
}

fn is_application(document: &Value) -> bool {
    let field = |key: &str| document.get(key).and_then(Value::as_str);
    field("apiVersion") == Some(APPLICATION_API_VERSION) && field("kind") == Some(APPLICATION_KIND)
}

/// The plugin environment split into the buckets resolution cares about.
#[derive(Debug, Default)]
struct PluginDirectives {
    instance: Option<String>,
    env: Option<String>,
    values_files: Vec<String>,
    setters: BTreeMap<String, String>,
    remaining: Vec<EnvVar>,
}

impl PluginDirectives {
    fn partition(app_name: &str, vars: Vec<EnvVar>) -> Self {
        let mut directives = Self::default();
        let mut indexed_values: Vec<(usize, String)> = Vec::new();

        for var in vars {
            if var.name.starts_with(SETTER_PREFIX) {
                match var.value.split_once('=') {
                    Some((key, value)) => {
                        directives
                            .setters
                            .insert(key.to_string(), value.to_string());
                    }
                    None => warn!(
                        "application '{}': setter '{}' has no '=' in '{}', skipping",
                        app_name, var.name, var.value
                    ),
                }
            }

            if var.name == INSTANCE_VAR {
                directives.instance = Some(setter_value(&var.value).to_string());
            } else if var.name == ENV_VAR {
                directives.env = Some(setter_value(&var.value).to_string());
            } else if let Some(index) = var.name.strip_prefix(VALUES_FILE_PREFIX) {
                match index.parse::<usize>() {
                    Ok(index) => indexed_values.push((index, var.value)),
                    Err(_) => warn!(
                        "application '{}': could not parse index from '{}', skipping",
                        app_name, var.name
                    ),
                }
            } else {
                directives.remaining.push(var);
            }
        }

        // Stable: equal indices keep their input order.
        indexed_values.sort_by_key(|(index, _)| *index);
        directives.values_files = indexed_values.into_iter().map(|(_, path)| path).collect();
        directives
    }
}

/// Returns the part of `key=value` after the first `=`, or `""` if there is none.
fn setter_value(raw: &str) -> &str {
    raw.split_once('=').map(|(_, value)| value).unwrap_or_default()
}

fn resolve(raw: RawApplication) -> Result<Application> {
    let RawApplication { metadata, spec } = raw;
    let RawSource {
        repo_url,
        target_revision,
        path,
        plugin,
    } = spec.source;
    let name = metadata.name;

    if name.is_empty() {
        return Err(Error::MissingName);
    }

    let directives =
        PluginDirectives::partition(&name, plugin.map(|p| p.env).unwrap_or_default());

    let instance = resolve_identity(
        INSTANCE_LABEL,
        metadata.labels.get(INSTANCE_LABEL).map(String::as_str),
        directives.instance.as_deref(),
    )?;
    let env = resolve_identity(
        ENV_LABEL,
        metadata.labels.get(ENV_LABEL).map(String::as_str),
        directives.env.as_deref(),
    )?;

    let repo_url = match metadata
        .annotations
        .get(RAW_REPOSITORY_ANNOTATION)
        .filter(|url| !url.is_empty())
    {
        Some(url) => url.clone(),
        None => {
            warn!(
                "application '{}': missing '{}' annotation, falling back to spec.source.repoURL='{}'",
                name, RAW_REPOSITORY_ANNOTATION, repo_url
            );
            if repo_url.is_empty() {
                return Err(Error::MissingRepository);
            }
            repo_url
        }
    };

    // An explicitly empty rawPath is honored as-is.
    let path = match metadata.annotations.get(RAW_PATH_ANNOTATION) {
        Some(path) => path.clone(),
        None => {
            warn!(
                "application '{}': missing '{}' annotation, falling back to spec.source.path='{}'",
                name, RAW_PATH_ANNOTATION, path
            );
            if path.is_empty() {
                warn!(
                    "application '{}': spec.source.path is empty too, using '{}'",
                    name, DEFAULT_PATH
                );
                DEFAULT_PATH.to_string()
            } else {
                path
            }
        }
    };

    Ok(Application {
        name,
        instance,
        env,
        repo_url,
        path,
        target_revision,
        plugin_env: directives.remaining,
        values_files: directives.values_files,
        setters: directives.setters,
    })
}

/// Picks one value from a label and a plugin variable. Empty values count as absent.
fn resolve_identity(field: &str, label: Option<&str>, plugin: Option<&str>) -> Result<String> {
    let label = label.filter(|v| !v.is_empty());
    let plugin = plugin.filter(|v| !v.is_empty());

    match (label, plugin) {
        (Some(label), Some(plugin)) if label != plugin => Err(Error::ConflictingValues {
            field: field.to_string(),
            label: label.to_string(),
            plugin: plugin.to_string(),
        }),
        (Some(value), _) | (None, Some(value)) => Ok(value.to_string()),
        (None, None) => Ok(String::new()),
    }
}
