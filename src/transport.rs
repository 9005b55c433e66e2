use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::PortName;
use crate::error::PortError;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart {
        field: String,
        file_name: String,
        content: Vec<u8>,
        form: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl PortRequest {
    pub fn new(method: Method, url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method,
            url: url.into(),
            body,
            bearer: None,
        }
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PortResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 300
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_slice(&self.body).map_err(|err| err.to_string())
    }
}

pub trait PortTransport: Send + Sync {
    fn send(&self, request: PortRequest) -> Result<PortResponse, PortError>;
}

impl<T: PortTransport + ?Sized> PortTransport for &T {
    fn send(&self, request: PortRequest) -> Result<PortResponse, PortError> {
        (**self).send(request)
    }
}

impl<T: PortTransport + ?Sized> PortTransport for std::sync::Arc<T> {
    fn send(&self, request: PortRequest) -> Result<PortResponse, PortError> {
        (**self).send(request)
    }
}

pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self, owner_id: &str, port: &PortName) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self, _owner_id: &str, _port: &PortName) -> Option<String> {
        Some(self.0.clone())
    }
}
