//! `key=value` system property files

use crate::ConfigError;
use std::collections::BTreeMap;
use std::path::Path;

/// In-memory view of a property file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    props: BTreeMap<String, String>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse property text; blank lines and `#` comments are skipped
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut props = BTreeMap::new();
        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedProperty {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { props })
    }

    /// Load a property file; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("Property file {} absent, starting empty", path.display());
            return Ok(Self::new());
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Set a property, replacing any existing value
    pub fn override_property(&mut self, key: &str, value: &str) {
        match self.props.insert(key.to_string(), value.to_string()) {
            Some(old) if old != value => {
                tracing::debug!("Property {} overridden: {} -> {}", key, old, value)
            }
            Some(_) => {}
            None => tracing::debug!("Property {} added: {}", key, value),
        }
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        for (key, value) in self.iter() {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        std::fs::write(path, out)?;
        tracing::info!("Wrote {} properties to {}", self.len(), path.display());
        Ok(())
    }
}
