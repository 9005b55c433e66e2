use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Capabilities, CustomProperty, PortName};
use crate::error::PortError;

pub const DEFAULT_CLUSTER_PREFIX: &str = "circle1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    pub cluster_prefix: String,
    pub verify_ssl: bool,
    pub timeout: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            cluster_prefix: DEFAULT_CLUSTER_PREFIX.to_string(),
            verify_ssl: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PortSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `VERIFY_SSL` must be exactly `True` to keep verification on.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cluster_prefix = lookup("RDS_CLUSTER_PREFIX")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.cluster_prefix);
        let verify_ssl = lookup("VERIFY_SSL")
            .map(|value| value == "True")
            .unwrap_or(defaults.verify_ssl);
        let timeout = lookup("RDS_PORT_TIMEOUT_SECS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            cluster_prefix,
            verify_ssl,
            timeout,
        }
    }

    pub fn base_address(&self, name: &PortName) -> String {
        format!("http://{}-{}", self.cluster_prefix, name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "portType", content = "value", rename_all = "camelCase")]
pub enum PortProperty {
    Metadata(bool),
    FileStorage(bool),
    CustomProperties(Vec<CustomProperty>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub port: String,
    #[serde(default)]
    pub properties: Vec<PortProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDescriptor {
    pub port: PortName,
    pub capabilities: Capabilities,
    pub custom_properties: Vec<CustomProperty>,
}

impl PortDescriptor {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            properties: Vec::new(),
        }
    }

    pub fn with(mut self, property: PortProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn resolve(&self) -> Result<ResolvedDescriptor, PortError> {
        let port: PortName = self.port.parse()?;
        let mut file_storage = false;
        let mut metadata = false;
        let mut custom_properties = Vec::new();

        for property in &self.properties {
            match property {
                PortProperty::Metadata(value) => metadata = *value,
                PortProperty::FileStorage(value) => file_storage = *value,
                PortProperty::CustomProperties(values) => custom_properties = values.clone(),
            }
        }

        Ok(ResolvedDescriptor {
            port,
            capabilities: Capabilities::new(file_storage, metadata),
            custom_properties,
        })
    }
}

pub struct DescriptorLoader;

impl DescriptorLoader {
    pub fn resolve(path: &Path) -> Result<Vec<PortDescriptor>, PortError> {
        let content = fs::read_to_string(path)
            .map_err(|_| PortError::DescriptorRead(path.to_path_buf()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Vec<PortDescriptor>, PortError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|err| PortError::InvalidDescriptor(err.to_string()))?;
        let descriptors = match value {
            Value::Array(_) => serde_json::from_value::<Vec<PortDescriptor>>(value),
            other => serde_json::from_value::<PortDescriptor>(other).map(|single| vec![single]),
        }
        .map_err(|err| PortError::InvalidDescriptor(err.to_string()))?;

        for descriptor in &descriptors {
            descriptor.resolve()?;
        }
        Ok(descriptors)
    }
}
