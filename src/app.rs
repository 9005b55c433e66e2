use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::warn;

use crate::adapter::{PortAdapter, PortBinding, PortSnapshot};
use crate::config::{PortDescriptor, PortSettings};
use crate::domain::{Capability, FileTransferMode, LoginMode};
use crate::error::PortError;
use crate::fs_util::{pack_zip, write_output};
use crate::transport::{CredentialProvider, PortTransport};

#[derive(Debug, Clone, Serialize)]
pub struct InfoResult {
    pub servicename: String,
    pub port: String,
    pub address: String,
    pub capabilities: Vec<Capability>,
    pub archive_mode: bool,
    pub transfer_mode: FileTransferMode,
    pub login_mode: LoginMode,
    pub has_credentials: bool,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub file: String,
    pub destination: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveResult {
    pub removed: bool,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassiveResult {
    pub folder: String,
    pub triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStrategy {
    Passive,
    Archive,
    Files,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyResult {
    pub source: String,
    pub target: String,
    pub strategy: TransferStrategy,
    pub transferred: Vec<String>,
    pub failed: Vec<String>,
    pub synchronized: bool,
}

impl CopyResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<T: PortTransport + Clone> {
    transport: T,
    settings: PortSettings,
    owner_id: String,
    research_index: u64,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl<T: PortTransport + Clone> App<T> {
    pub fn new(transport: T, settings: PortSettings, owner_id: impl Into<String>, research_index: u64) -> Self {
        Self {
            transport,
            settings,
            owner_id: owner_id.into(),
            research_index,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn open(&self, descriptor: &PortDescriptor, address: Option<&str>) -> Result<PortAdapter<T>, PortError> {
        let mut binding = PortBinding::from_descriptor(descriptor, self.owner_id.clone(), self.research_index)?;
        if let Some(address) = address {
            binding = binding.address(address);
        }
        if let Some(provider) = &self.credentials {
            binding = binding.credentials(Arc::clone(provider));
        }
        PortAdapter::connect(self.transport.clone(), &self.settings, binding)
    }

    pub fn list(&self, adapter: &PortAdapter<T>) -> PortSnapshot {
        adapter.snapshot()
    }

    pub fn info(&self, adapter: &PortAdapter<T>) -> InfoResult {
        InfoResult {
            servicename: adapter.name().service().to_string(),
            port: adapter.name().to_string(),
            address: adapter.base_address().to_string(),
            capabilities: adapter.capabilities().iter().collect(),
            archive_mode: adapter.archive_mode(),
            transfer_mode: adapter.transfer_mode(),
            login_mode: adapter.login_mode(),
            has_credentials: adapter.credentials().is_some(),
            files: adapter.cached_files().len(),
        }
    }

    pub fn fetch(
        &self,
        adapter: &PortAdapter<T>,
        index: usize,
        out_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, PortError> {
        let started = Instant::now();
        let file = adapter
            .cached_files()
            .get(index)
            .cloned()
            .ok_or(PortError::FileIndexOutOfRange {
                index,
                len: adapter.cached_files().len(),
            })?;
        let destination = local_destination(out_dir, &file)?;
        let content = adapter.get_file(index)?;
        write_output(destination.as_std_path(), &content)?;
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; wrote {file}"),
            elapsed: Some(started.elapsed()),
        });
        Ok(FetchResult {
            file,
            destination: destination.to_string(),
            bytes: content.len(),
        })
    }

    pub fn remove(&self, adapter: &mut PortAdapter<T>, index: usize) -> Result<RemoveResult, PortError> {
        let removed = adapter.remove_file(index)?;
        Ok(RemoveResult {
            removed,
            files: adapter.cached_files().to_vec(),
        })
    }

    pub fn remove_all(&self, adapter: &mut PortAdapter<T>) -> Result<RemoveResult, PortError> {
        let removed = adapter.remove_all_files()?;
        Ok(RemoveResult {
            removed,
            files: adapter.cached_files().to_vec(),
        })
    }

    pub fn passive(&self, adapter: &PortAdapter<T>, folder: &str) -> PassiveResult {
        PassiveResult {
            folder: folder.to_string(),
            triggered: adapter.trigger_passive_mode(folder),
        }
    }

    pub fn copy<U: PortTransport>(
        &self,
        source: &PortAdapter<U>,
        target: &mut PortAdapter<T>,
        sink: &dyn ProgressSink,
    ) -> Result<CopyResult, PortError> {
        let started = Instant::now();
        let files = source.cached_files().to_vec();
        let mut transferred = Vec::new();
        let mut failed = Vec::new();

        let strategy = if target.transfer_mode() == FileTransferMode::Passive {
            TransferStrategy::Passive
        } else if target.archive_mode() {
            TransferStrategy::Archive
        } else {
            TransferStrategy::Files
        };

        match strategy {
            TransferStrategy::Passive => {
                let folder = source.filepath().unwrap_or_default();
                if target.trigger_passive_mode(&folder) {
                    transferred = files;
                } else {
                    failed = files;
                }
            }
            TransferStrategy::Archive => {
                let mut packed = Vec::new();
                let entries = files
                    .iter()
                    .enumerate()
                    .filter_map(|(index, file)| match source.get_file(index) {
                        Ok(content) => {
                            packed.push(file.clone());
                            Some(Ok((file.clone(), content)))
                        }
                        Err(err) => {
                            warn!(file = %file, error = %err, "source file unavailable, left out of archive");
                            failed.push(file.clone());
                            None
                        }
                    });
                let archive = pack_zip(entries)?;
                if !packed.is_empty() {
                    let name = format!("project-{}.zip", self.research_index);
                    if target.add_file(&name, &archive) {
                        transferred = packed;
                    } else {
                        failed.extend(packed);
                    }
                }
            }
            TransferStrategy::Files => {
                for (index, file) in files.into_iter().enumerate() {
                    let content = match source.get_file(index) {
                        Ok(content) => content,
                        Err(err) => {
                            warn!(file = %file, error = %err, "source file unavailable, skipping");
                            failed.push(file);
                            continue;
                        }
                    };
                    if target.add_file(&file, &content) {
                        transferred.push(file);
                    } else {
                        failed.push(file);
                    }
                }
            }
        }

        let synchronized = match target.reload() {
            Ok(()) => true,
            Err(err) => {
                warn!(port = %target.name(), error = %err, "target resync after copy failed");
                false
            }
        };
        sink.event(ProgressEvent {
            message: format!(
                "phase=Copy; {} transferred, {} failed",
                transferred.len(),
                failed.len()
            ),
            elapsed: Some(started.elapsed()),
        });

        Ok(CopyResult {
            source: source.name().to_string(),
            target: target.name().to_string(),
            strategy,
            transferred,
            failed,
            synchronized,
        })
    }
}

fn local_destination(out_dir: &Utf8Path, file: &str) -> Result<Utf8PathBuf, PortError> {
    let relative = Utf8Path::new(file.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Utf8Component::Normal(_) | Utf8Component::CurDir));
    if escapes || relative.as_str().is_empty() {
        return Err(PortError::Filesystem(format!(
            "refusing to write {file} outside {out_dir}"
        )));
    }
    Ok(out_dir.join(relative))
}
