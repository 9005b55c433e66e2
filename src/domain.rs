use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PortError;

const PORT_PREFIX: &str = "port-";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortName {
    service: String,
    normalized: String,
}

impl PortName {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }
}

impl fmt::Display for PortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized)
    }
}

impl FromStr for PortName {
    type Err = PortError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let service = value.trim();
        if service.is_empty() {
            return Err(PortError::InvalidPortName(value.to_string()));
        }
        let lower = service.to_lowercase();
        let normalized = if lower.starts_with(PORT_PREFIX) {
            lower
        } else {
            format!("{PORT_PREFIX}{lower}")
        };
        Ok(Self {
            service: service.to_string(),
            normalized,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    FileStorage,
    Metadata,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::FileStorage, Capability::Metadata];

    pub fn supports(self, operation: Operation) -> bool {
        match (self, operation) {
            (Capability::FileStorage, Operation::Reload)
            | (Capability::FileStorage, Operation::FetchFile)
            | (Capability::FileStorage, Operation::RemoveFile) => true,
            (Capability::FileStorage, Operation::AddFile)
            | (Capability::FileStorage, Operation::RemoveAllFiles)
            | (Capability::FileStorage, Operation::PassiveTrigger) => false,
            (Capability::Metadata, Operation::FetchFile) => false,
            (Capability::Metadata, _) => true,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::FileStorage => write!(f, "fileStorage"),
            Capability::Metadata => write!(f, "metadata"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reload,
    FetchFile,
    AddFile,
    RemoveFile,
    RemoveAllFiles,
    PassiveTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    file_storage: bool,
    metadata: bool,
}

impl Capabilities {
    pub fn new(file_storage: bool, metadata: bool) -> Self {
        Self {
            file_storage,
            metadata,
        }
    }

    pub fn contains(self, capability: Capability) -> bool {
        match capability {
            Capability::FileStorage => self.file_storage,
            Capability::Metadata => self.metadata,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.file_storage && !self.metadata
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.contains(*capability))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTransferMode {
    #[default]
    Active,
    Passive,
}

impl TryFrom<u8> for FileTransferMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FileTransferMode::Active),
            1 => Ok(FileTransferMode::Passive),
            other => Err(format!("unknown file transfer mode {other}")),
        }
    }
}

impl fmt::Display for FileTransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileTransferMode::Active => write!(f, "active"),
            FileTransferMode::Passive => write!(f, "passive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMode {
    Credentials,
    #[default]
    OAuth,
    None,
}

impl TryFrom<u8> for LoginMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LoginMode::Credentials),
            1 => Ok(LoginMode::OAuth),
            2 => Ok(LoginMode::None),
            other => Err(format!("unknown login mode {other}")),
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginMode::Credentials => write!(f, "credentials"),
            LoginMode::OAuth => write!(f, "oauth"),
            LoginMode::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProperty {
    pub key: String,
    pub value: Value,
}

impl CustomProperty {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Map<String, Value>);

impl Credentials {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Credentials {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

pub fn property_as_segment(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
