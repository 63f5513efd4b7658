use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use common::api::Machine;
use tracing::debug;

use crate::error::FleetError;
use crate::transport::{DumpArtifact, DynFleetTransport};

/// Where a downloaded dump ends up.
#[async_trait]
pub trait DumpSink: Send + Sync {
    /// Persist the artifact as a whole; nothing may be visible on failure.
    async fn deliver(&self, artifact: DumpArtifact) -> Result<PathBuf, FleetError>;
}

pub type DynDumpSink = Arc<dyn DumpSink>;

/// Writes dumps into a directory through a temp file and a rename.
pub struct FileDumpSink {
    dir: PathBuf,
}

impl FileDumpSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_atomic(dir: &Path, artifact: &DumpArtifact) -> Result<PathBuf, FleetError> {
        let target = dir.join(sanitize_file_name(&artifact.file_name, artifact.machine_id));
        let storage = |source: std::io::Error| FleetError::Storage {
            path: target.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(storage)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(storage)?;
        tmp.write_all(&artifact.bytes).map_err(storage)?;
        tmp.as_file().sync_all().map_err(storage)?;
        tmp.persist(&target).map_err(|err| storage(err.error))?;
        Ok(target)
    }
}

#[async_trait]
impl DumpSink for FileDumpSink {
    async fn deliver(&self, artifact: DumpArtifact) -> Result<PathBuf, FleetError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || Self::write_atomic(&dir, &artifact))
            .await
            .map_err(|err| FleetError::Storage {
                path: self.dir.clone(),
                source: std::io::Error::other(err),
            })?
    }
}

pub fn default_dump_file_name(machine_id: i64) -> String {
    format!("machine-{machine_id}-dump.tar.gz")
}

/// Strip any directory components the server may have put in the name.
fn sanitize_file_name(name: &str, machine_id: i64) -> String {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        default_dump_file_name(machine_id)
    } else {
        base.to_string()
    }
}

/// Fire-and-forget export of one machine's diagnostic state.
pub struct DumpOrchestrator {
    transport: DynFleetTransport,
    sink: DynDumpSink,
}

impl DumpOrchestrator {
    pub fn new(transport: DynFleetTransport, sink: DynDumpSink) -> Self {
        Self { transport, sink }
    }

    pub async fn download_dump(&self, machine: &Machine) -> Result<PathBuf, FleetError> {
        debug!(machine_id = machine.id, hostname = %machine.hostname, "requesting machine dump");
        let artifact = self.transport.export_machine_dump(machine.id).await?;
        self.sink.deliver(artifact).await
    }
}
