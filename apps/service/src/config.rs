use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use url::Url;

const DEFAULT_METHOD: &str = "GET";
const DEFAULT_INTERVAL_SECONDS: u64 = 30;
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

pub const MIN_INTERVAL_SECONDS: u64 = 5;
pub const MIN_TIMEOUT_SECONDS: u64 = 1;

/// One monitored endpoint, as declared in the config file.
///
/// Loaded once at startup and treated as immutable afterwards.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    pub method: String,
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
    pub headers: Option<BTreeMap<String, String>>,
    pub expected_statuses: Option<Vec<u16>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config file must contain a JSON array of endpoints")]
    NotAnArray,
    #[error("endpoint is missing a non-empty 'name'")]
    MissingName,
    #[error("endpoint '{0}' is missing a non-empty 'url'")]
    MissingUrl(String),
    #[error("endpoint '{name}' has an invalid 'url': {source}")]
    InvalidUrl {
        name: String,
        source: url::ParseError,
    },
    #[error("endpoint '{name}' has unsupported url scheme '{scheme}'")]
    UnsupportedScheme { name: String, scheme: String },
    #[error("endpoint '{0}' has an invalid 'method'")]
    InvalidMethod(String),
    #[error("endpoint '{0}' has an invalid 'interval_seconds' (minimum {MIN_INTERVAL_SECONDS})")]
    InvalidInterval(String),
    #[error("endpoint '{0}' has an invalid 'timeout_seconds' (minimum {MIN_TIMEOUT_SECONDS})")]
    InvalidTimeout(String),
    #[error("endpoint '{0}' has invalid 'headers' (must map strings to strings)")]
    InvalidHeaders(String),
    #[error("endpoint '{0}' has invalid 'expected_statuses' (must be a list of status codes)")]
    InvalidStatuses(String),
    #[error("duplicate endpoint name '{0}'")]
    DuplicateName(String),
}

/// Load and validate the endpoint list from a JSON config file.
pub fn load_endpoints(path: &Path) -> Result<Vec<EndpointConfig>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_endpoints(&raw)
}

pub fn parse_endpoints(raw: &str) -> Result<Vec<EndpointConfig>, ConfigError> {
    let document: Value = serde_json::from_str(raw)?;
    let Value::Array(entries) = document else {
        return Err(ConfigError::NotAnArray);
    };

    let mut endpoints = Vec::with_capacity(entries.len());
    let mut seen = BTreeSet::new();
    for entry in &entries {
        let endpoint = validate_endpoint(entry)?;
        if !seen.insert(endpoint.name.clone()) {
            return Err(ConfigError::DuplicateName(endpoint.name));
        }
        endpoints.push(endpoint);
    }
    Ok(endpoints)
}

fn validate_endpoint(raw: &Value) -> Result<EndpointConfig, ConfigError> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ConfigError::MissingName)?
        .to_string();

    let url = raw
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ConfigError::MissingUrl(name.clone()))?
        .to_string();
    let parsed = Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
        name: name.clone(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ConfigError::UnsupportedScheme {
                name,
                scheme: scheme.to_string(),
            });
        }
    }

    let method = match raw.get("method").filter(|value| !value.is_null()) {
        None => DEFAULT_METHOD.to_string(),
        Some(value) => value
            .as_str()
            .map(str::trim)
            .filter(|method| !method.is_empty())
            .map(str::to_uppercase)
            .filter(|method| Method::from_bytes(method.as_bytes()).is_ok())
            .ok_or_else(|| ConfigError::InvalidMethod(name.clone()))?,
    };

    let interval_seconds = validate_seconds(
        raw.get("interval_seconds"),
        DEFAULT_INTERVAL_SECONDS,
        MIN_INTERVAL_SECONDS,
    )
    .ok_or_else(|| ConfigError::InvalidInterval(name.clone()))?;
    let timeout_seconds = validate_seconds(
        raw.get("timeout_seconds"),
        DEFAULT_TIMEOUT_SECONDS,
        MIN_TIMEOUT_SECONDS,
    )
    .ok_or_else(|| ConfigError::InvalidTimeout(name.clone()))?;

    let headers = match raw.get("headers").filter(|value| !value.is_null()) {
        None => None,
        Some(value) => {
            let object = value
                .as_object()
                .ok_or_else(|| ConfigError::InvalidHeaders(name.clone()))?;
            let mut headers = BTreeMap::new();
            for (key, value) in object {
                let value = value
                    .as_str()
                    .ok_or_else(|| ConfigError::InvalidHeaders(name.clone()))?;
                headers.insert(key.clone(), value.to_string());
            }
            Some(headers)
        }
    };

    let expected_statuses = match raw.get("expected_statuses").filter(|value| !value.is_null()) {
        None => None,
        Some(value) => {
            let list = value
                .as_array()
                .ok_or_else(|| ConfigError::InvalidStatuses(name.clone()))?;
            let mut statuses = Vec::with_capacity(list.len());
            for entry in list {
                let status = entry
                    .as_u64()
                    .and_then(|status| u16::try_from(status).ok())
                    .ok_or_else(|| ConfigError::InvalidStatuses(name.clone()))?;
                statuses.push(status);
            }
            Some(statuses)
        }
    };

    Ok(EndpointConfig {
        name,
        url,
        method,
        interval_seconds,
        timeout_seconds,
        headers,
        expected_statuses,
    })
}

fn validate_seconds(raw: Option<&Value>, default: u64, minimum: u64) -> Option<u64> {
    match raw.filter(|value| !value.is_null()) {
        None => Some(default),
        Some(value) => value.as_u64().filter(|seconds| *seconds >= minimum),
    }
}
