use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::config::PortSettings;
use crate::error::PortError;
use crate::transport::{PortRequest, PortResponse, PortTransport, RequestBody};

#[derive(Clone)]
pub struct PortHttpClient {
    client: Client,
}

impl PortHttpClient {
    pub fn new(settings: &PortSettings) -> Result<Self, PortError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rds-port-adapter/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PortError::Transport(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|err| PortError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

impl PortTransport for PortHttpClient {
    fn send(&self, request: PortRequest) -> Result<PortResponse, PortError> {
        let PortRequest {
            method,
            url,
            body,
            bearer,
        } = request;

        let mut builder = self.client.request(method.clone(), &url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart {
                field,
                file_name,
                content,
                form,
            } => {
                let mut multipart = Form::new().part(field, Part::bytes(content).file_name(file_name));
                for (key, value) in form {
                    multipart = multipart.text(key, value);
                }
                builder.multipart(multipart)
            }
        };

        debug!(%method, %url, "sending port request");
        let response = builder
            .send()
            .map_err(|err| PortError::Transport(format!("{method} {url}: {err}")))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|err| PortError::Transport(format!("{method} {url}: {err}")))?;
        debug!(%method, %url, status, bytes = body.len(), "port responded");

        Ok(PortResponse {
            status,
            body: body.to_vec(),
        })
    }
}
