use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use common::api::MachinePage;

use crate::error::FleetError;
use crate::fleet::query::MachineQuery;

pub type DynFleetTransport = Arc<dyn FleetTransport>;

/// Downloaded diagnostic export of a single machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifact {
    pub machine_id: i64,
    pub file_name: String,
    pub bytes: Bytes,
}

/// Server operations the controller depends on. Every call may be slow and
/// may fail; none is retried by the controller.
#[async_trait]
pub trait FleetTransport: Send + Sync {
    async fn list_machines(&self, query: &MachineQuery) -> Result<MachinePage, FleetError>;
    async fn fetch_installation_token(&self) -> Result<String, FleetError>;
    async fn regenerate_installation_token(&self) -> Result<String, FleetError>;
    async fn export_machine_dump(&self, machine_id: i64) -> Result<DumpArtifact, FleetError>;
}
