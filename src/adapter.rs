use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use crate::config::{PortDescriptor, PortSettings};
use crate::dispatch::{BranchOutcome, MergePolicy, dispatch};
use crate::domain::{
    Capabilities, Capability, Credentials, CustomProperty, FileTransferMode, LoginMode, Operation,
    PortName, property_as_segment,
};
use crate::error::PortError;
use crate::transport::{CredentialProvider, PortRequest, PortResponse, PortTransport, RequestBody};

const FILEPATH_PROPERTY: &str = "filepath";
const PROJECT_ID_PROPERTY: &str = "projectId";

#[derive(Clone)]
pub struct PortBinding {
    pub port: String,
    pub owner_id: String,
    pub research_index: u64,
    pub capabilities: Capabilities,
    pub custom_properties: Vec<CustomProperty>,
    pub address: Option<String>,
    pub credentials: Option<Arc<dyn CredentialProvider>>,
}

impl PortBinding {
    pub fn new(port: impl Into<String>, owner_id: impl Into<String>, research_index: u64) -> Self {
        Self {
            port: port.into(),
            owner_id: owner_id.into(),
            research_index,
            capabilities: Capabilities::default(),
            custom_properties: Vec::new(),
            address: None,
            credentials: None,
        }
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn custom_properties(mut self, properties: Vec<CustomProperty>) -> Self {
        self.custom_properties = properties;
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn from_descriptor(
        descriptor: &PortDescriptor,
        owner_id: impl Into<String>,
        research_index: u64,
    ) -> Result<Self, PortError> {
        let resolved = descriptor.resolve()?;
        Ok(Self::new(descriptor.port.clone(), owner_id, research_index)
            .capabilities(resolved.capabilities)
            .custom_properties(resolved.custom_properties))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PortInformations {
    pub archive_mode: bool,
    pub transfer_mode: FileTransferMode,
    pub login_mode: LoginMode,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InformationsResponse {
    #[serde(default)]
    file_transfer_archive: Option<String>,
    #[serde(default)]
    file_transfer_mode: Option<u8>,
    #[serde(default)]
    login_mode: Option<u8>,
    #[serde(default)]
    credentials: Option<Map<String, Value>>,
}

impl TryFrom<InformationsResponse> for PortInformations {
    type Error = String;

    fn try_from(response: InformationsResponse) -> Result<Self, Self::Error> {
        let archive_mode = response.file_transfer_archive.as_deref() == Some("zip");
        let transfer_mode = match response.file_transfer_mode {
            Some(value) => FileTransferMode::try_from(value)?,
            None => FileTransferMode::default(),
        };
        let login_mode = match response.login_mode {
            Some(value) => LoginMode::try_from(value)?,
            None => LoginMode::default(),
        };
        let credentials = match login_mode {
            LoginMode::Credentials => Some(Credentials::from(response.credentials.unwrap_or_default())),
            LoginMode::OAuth | LoginMode::None => None,
        };
        Ok(Self {
            archive_mode,
            transfer_mode,
            login_mode,
            credentials,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FolderResponse {
    #[serde(default)]
    files: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSnapshot {
    pub servicename: String,
    pub files: Vec<String>,
}

pub struct PortAdapter<T: PortTransport> {
    name: PortName,
    base_address: String,
    owner_id: String,
    research_index: u64,
    capabilities: Capabilities,
    custom_properties: Vec<CustomProperty>,
    files: Vec<String>,
    informations: PortInformations,
    credentials: Option<Arc<dyn CredentialProvider>>,
    transport: T,
}

impl<T: PortTransport> PortAdapter<T> {
    pub fn connect(transport: T, settings: &PortSettings, binding: PortBinding) -> Result<Self, PortError> {
        let name: PortName = binding.port.parse()?;
        let base_address = match binding.address {
            Some(address) => address.trim_end_matches('/').to_string(),
            None => settings.base_address(&name),
        };

        let mut adapter = Self {
            name,
            base_address,
            owner_id: binding.owner_id,
            research_index: binding.research_index,
            capabilities: binding.capabilities,
            custom_properties: binding.custom_properties,
            files: Vec::new(),
            informations: PortInformations::default(),
            credentials: binding.credentials,
            transport,
        };
        adapter.reload()?;
        Ok(adapter)
    }

    pub fn from_descriptor(
        transport: T,
        settings: &PortSettings,
        descriptor: &PortDescriptor,
        owner_id: impl Into<String>,
        research_index: u64,
    ) -> Result<Self, PortError> {
        let binding = PortBinding::from_descriptor(descriptor, owner_id, research_index)?;
        Self::connect(transport, settings, binding)
    }

    pub fn name(&self) -> &PortName {
        &self.name
    }

    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn research_index(&self) -> u64 {
        self.research_index
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn custom_properties(&self) -> &[CustomProperty] {
        &self.custom_properties
    }

    pub fn cached_files(&self) -> &[String] {
        &self.files
    }

    pub fn informations(&self) -> &PortInformations {
        &self.informations
    }

    pub fn archive_mode(&self) -> bool {
        self.informations.archive_mode
    }

    pub fn transfer_mode(&self) -> FileTransferMode {
        self.informations.transfer_mode
    }

    pub fn login_mode(&self) -> LoginMode {
        self.informations.login_mode
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.informations.credentials.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Both branches are fetched before anything is stored; a failure leaves the previous state untouched.
    pub fn reload(&mut self) -> Result<(), PortError> {
        let mut listing = None;
        let mut informations = None;
        for capability in self.capabilities.iter() {
            match capability {
                Capability::FileStorage => listing = Some(self.fetch_listing()?),
                Capability::Metadata => informations = Some(self.fetch_informations()?),
            }
        }

        if let Some(files) = listing {
            self.files = files;
        }
        if let Some(informations) = informations {
            self.informations = informations;
        }
        info!(port = %self.name, files = self.files.len(), "port synchronized");
        Ok(())
    }

    pub fn reload_informations(&mut self) -> Result<(), PortError> {
        if self.capabilities.contains(Capability::Metadata) {
            self.informations = self.fetch_informations()?;
        }
        Ok(())
    }

    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.custom_properties
            .iter()
            .find(|property| property.key == key)
            .map(|property| &property.value)
    }

    pub fn filepath(&self) -> Option<String> {
        let path = self.get_property(FILEPATH_PROPERTY).and_then(property_as_segment)?;
        match path.strip_suffix('/') {
            Some(stripped) => Some(stripped.to_string()),
            None => Some(path),
        }
    }

    pub fn project_id(&self) -> Option<String> {
        self.get_property(PROJECT_ID_PROPERTY).and_then(property_as_segment)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.iter().map(String::as_str)
    }

    /// Content is requested one file at a time, as the iterator advances.
    pub fn files_with_content(&self) -> FileContents<'_, T> {
        FileContents {
            adapter: self,
            index: 0,
        }
    }

    pub fn get_file(&self, index: usize) -> Result<Vec<u8>, PortError> {
        let file = self.cached_file(index)?;
        let source = self
            .capabilities
            .iter()
            .find(|capability| capability.supports(Operation::FetchFile));
        let Some(Capability::FileStorage) = source else {
            return Ok(Vec::new());
        };

        let filepath = self.remote_path(file);
        debug!(port = %self.name, %filepath, "fetching file");
        let response = self.send(self.request(
            Method::GET,
            "/storage/file",
            RequestBody::Json(json!({ "userId": self.owner_id, "filepath": filepath })),
        ))?;
        if !response.is_success() {
            warn!(port = %self.name, %filepath, status = response.status, "file fetch rejected");
            return Ok(Vec::new());
        }
        debug!(port = %self.name, bytes = response.body.len(), "got file content");
        Ok(response.body)
    }

    pub fn trigger_passive_mode(&self, folder: &str) -> bool {
        debug!(port = %self.name, folder, "starting passive mode");
        let reports = dispatch(self.capabilities, Operation::PassiveTrigger, |capability| match capability {
            Capability::Metadata => match self.project_files_path() {
                Some(path) => self.send_soft(
                    self.request(
                        Method::POST,
                        &path,
                        RequestBody::Form(vec![
                            ("userId".to_string(), self.owner_id.clone()),
                            ("folder".to_string(), folder.to_string()),
                        ]),
                    ),
                    "passive trigger",
                ),
                None => self.missing_project_id("passive trigger"),
            },
            Capability::FileStorage => BranchOutcome::Unsupported,
        });
        MergePolicy::NoneRejected.merge(&reports)
    }

    pub fn add_file(&self, filename: &str, content: &[u8]) -> bool {
        debug!(port = %self.name, filename, bytes = content.len(), "adding file");
        let reports = dispatch(self.capabilities, Operation::AddFile, |capability| match capability {
            Capability::Metadata => match self.project_files_path() {
                Some(path) => self.send_soft(
                    self.request(
                        Method::POST,
                        &path,
                        RequestBody::Multipart {
                            field: "file".to_string(),
                            file_name: filename.to_string(),
                            content: content.to_vec(),
                            form: vec![
                                ("userId".to_string(), self.owner_id.clone()),
                                ("filename".to_string(), filename.to_string()),
                            ],
                        },
                    ),
                    "add file",
                ),
                None => self.missing_project_id("add file"),
            },
            // TODO: upload through /storage/file once storage ports accept writes.
            Capability::FileStorage => BranchOutcome::Unsupported,
        });
        MergePolicy::NoneRejected.merge(&reports)
    }

    pub fn remove_file(&mut self, index: usize) -> Result<bool, PortError> {
        let file = self.cached_file(index)?;
        debug!(port = %self.name, file, "removing file");
        let reports = dispatch(self.capabilities, Operation::RemoveFile, |capability| match capability {
            Capability::FileStorage => self.send_soft(
                self.request(
                    Method::DELETE,
                    "/storage/file",
                    RequestBody::Json(json!({
                        "userId": self.owner_id,
                        "filepath": self.remote_path(file),
                    })),
                ),
                "storage delete",
            ),
            Capability::Metadata => match self.project_files_path() {
                Some(path) => self.send_soft(
                    self.request(
                        Method::DELETE,
                        &format!("{path}/{index}"),
                        RequestBody::Json(json!({ "userId": self.owner_id })),
                    ),
                    "metadata delete",
                ),
                None => self.missing_project_id("metadata delete"),
            },
        });

        if !MergePolicy::AnyAccepted.merge(&reports) {
            return Ok(false);
        }
        self.files.remove(index);
        Ok(true)
    }

    pub fn remove_all_files(&mut self) -> Result<bool, PortError> {
        debug!(port = %self.name, "removing all files");
        let reports = dispatch(self.capabilities, Operation::RemoveAllFiles, |capability| match capability {
            Capability::Metadata => match self.project_files_path() {
                Some(path) => self.send_soft(
                    self.request(
                        Method::DELETE,
                        &path,
                        RequestBody::Json(json!({ "userId": self.owner_id })),
                    ),
                    "bulk delete",
                ),
                None => self.missing_project_id("bulk delete"),
            },
            Capability::FileStorage => BranchOutcome::Unsupported,
        });

        if !MergePolicy::AnyAccepted.merge(&reports) {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    pub fn snapshot(&self) -> PortSnapshot {
        PortSnapshot {
            servicename: self.name.service().to_string(),
            files: self.files.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    fn cached_file(&self, index: usize) -> Result<&str, PortError> {
        self.files
            .get(index)
            .map(String::as_str)
            .ok_or(PortError::FileIndexOutOfRange {
                index,
                len: self.files.len(),
            })
    }

    fn remote_path(&self, file: &str) -> String {
        format!("{}/{}", self.filepath().unwrap_or_default(), file)
    }

    fn project_files_path(&self) -> Option<String> {
        self.project_id()
            .map(|project_id| format!("/metadata/project/{project_id}/files"))
    }

    fn missing_project_id(&self, action: &str) -> BranchOutcome {
        warn!(port = %self.name, action, "no projectId property, metadata request not sent");
        BranchOutcome::Rejected
    }

    fn request(&self, method: Method, path: &str, body: RequestBody) -> PortRequest {
        let token = self
            .credentials
            .as_ref()
            .and_then(|provider| provider.bearer_token(&self.owner_id, &self.name));
        PortRequest::new(method, format!("{}{}", self.base_address, path), body).with_bearer(token)
    }

    fn send(&self, request: PortRequest) -> Result<PortResponse, PortError> {
        self.transport.send(request)
    }

    fn send_soft(&self, request: PortRequest, action: &str) -> BranchOutcome {
        match self.send(request) {
            Ok(response) if response.is_success() => BranchOutcome::Accepted,
            Ok(response) => {
                error!(
                    port = %self.name,
                    action,
                    status = response.status,
                    body = %response.text(),
                    "port rejected request"
                );
                BranchOutcome::Rejected
            }
            Err(err) => {
                warn!(port = %self.name, action, error = %err, "port request failed");
                BranchOutcome::Rejected
            }
        }
    }

    fn fetch_listing(&self) -> Result<Vec<String>, PortError> {
        let response = self.send_checked(self.request(
            Method::GET,
            "/storage/folder",
            RequestBody::Json(json!({ "filepath": self.filepath(), "userId": self.owner_id })),
        ))?;
        let folder: FolderResponse = response
            .json()
            .map_err(|message| self.unavailable(format!("invalid folder listing: {message}")))?;
        Ok(folder.files.unwrap_or_default())
    }

    fn fetch_informations(&self) -> Result<PortInformations, PortError> {
        let response =
            self.send_checked(self.request(Method::GET, "/metadata/informations", RequestBody::Empty))?;
        let raw: InformationsResponse = response
            .json()
            .map_err(|message| self.unavailable(format!("invalid informations: {message}")))?;
        PortInformations::try_from(raw).map_err(|message| self.unavailable(message))
    }

    fn send_checked(&self, request: PortRequest) -> Result<PortResponse, PortError> {
        let response = self
            .send(request)
            .map_err(|err| self.unavailable(err.to_string()))?;
        if !response.is_success() {
            return Err(self.unavailable(format!("status {}: {}", response.status, response.text())));
        }
        Ok(response)
    }

    fn unavailable(&self, message: String) -> PortError {
        PortError::BackendUnavailable {
            port: self.name.to_string(),
            message,
        }
    }
}

impl<T: PortTransport> fmt::Debug for PortAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortAdapter")
            .field("name", &self.name)
            .field("base_address", &self.base_address)
            .field("capabilities", &self.capabilities)
            .field("files", &self.files)
            .field("informations", &self.informations)
            .finish_non_exhaustive()
    }
}

impl<T: PortTransport, U: PortTransport> PartialEq<PortAdapter<U>> for PortAdapter<T> {
    fn eq(&self, other: &PortAdapter<U>) -> bool {
        self.snapshot() == other.snapshot()
    }
}

impl<T: PortTransport> Serialize for PortAdapter<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

pub struct FileContents<'a, T: PortTransport> {
    adapter: &'a PortAdapter<T>,
    index: usize,
}

impl<T: PortTransport> Iterator for FileContents<'_, T> {
    type Item = Result<(String, Vec<u8>), PortError>;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.adapter.files.get(self.index)?.clone();
        let content = self.adapter.get_file(self.index);
        self.index += 1;
        Some(content.map(|content| (file, content)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.adapter.files.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
