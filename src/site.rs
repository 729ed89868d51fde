//! Declarative site and request definitions, as persisted in site config files.

use crate::config::ConfigError;
use crate::parser::ResponseSpec;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One external site: where it lives and which requests it supports.
///
/// Shared read-only between calls; per-call overrides are applied to copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub api: String,
    #[serde(default, alias = "request_definitions")]
    pub requests: HashMap<String, RequestDefinition>,
}

impl SiteConfig {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = api.into();
        self
    }

    pub fn with_request(mut self, id: impl Into<String>, definition: RequestDefinition) -> Self {
        self.requests.insert(id.into(), definition);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn request(&self, id: &str) -> Option<&RequestDefinition> {
        self.requests.get(id)
    }
}

/// How to build (and parse) one logical request against a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefinition {
    pub method: String,
    /// Absolute URL, or a path appended to the domain (or API base with `use_api`).
    pub path: String,
    pub params: Params,
    pub form_data: Params,
    pub headers: BTreeMap<String, String>,
    pub required_headers: Vec<String>,
    /// Statuses treated as success. Empty means only 200.
    pub success_status_codes: Vec<u16>,
    pub use_api: bool,
    pub response: ResponseSpec,
}

impl Default for RequestDefinition {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: String::new(),
            params: Params::default(),
            form_data: Params::default(),
            headers: BTreeMap::new(),
            required_headers: Vec::new(),
            success_status_codes: Vec::new(),
            use_api: false,
            response: ResponseSpec::default(),
        }
    }
}

impl RequestDefinition {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn is_success(&self, status: u16) -> bool {
        if self.success_status_codes.is_empty() {
            status == 200
        } else {
            self.success_status_codes.contains(&status)
        }
    }
}

/// Multi-valued parameters (query string or form body).
///
/// Keys serialize in sorted order; values under one key keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Vec<String>>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Appends every value of `other`, never replacing existing ones.
    pub fn append(&mut self, other: &Params) {
        for (key, values) in &other.0 {
            self.0
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    /// Returns a copy with every value passed through `f`.
    pub fn map_values(&self, f: impl Fn(&str) -> String) -> Params {
        Params(
            self.0
                .iter()
                .map(|(key, values)| (key.clone(), values.iter().map(|v| f(v)).collect()))
                .collect(),
        )
    }

    /// `application/x-www-form-urlencoded` representation.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.0 {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.add(key, value);
        }
        params
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
        Ok(Params(
            raw.into_iter()
                .map(|(key, value)| match value {
                    OneOrMany::One(v) => (key, vec![v]),
                    OneOrMany::Many(vs) => (key, vs),
                })
                .collect(),
        ))
    }
}
