//! The narrow downstream collaborator (§4.8, C8): everything the gateway
//! knows about cameras, recordings, storage and external streams comes
//! through this trait. Shaped like a narrow async-trait capability
//! interface in the teacher's agent/runner layer — one method per
//! operation, no shared mutable state leaking across the boundary.

pub mod stub;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("camera not found: {0}")]
    CameraNotFound(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("media error: {0}")]
    MediaError(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraSummary {
    pub device: String,
    pub name: String,
    pub connected: bool,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResult {
    pub device: String,
    pub path: String,
    pub taken_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingHandle {
    pub device: String,
    pub recording: bool,
    pub started_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingFile {
    pub device: String,
    pub path: String,
    pub size_bytes: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileList {
    pub files: Vec<RecordingFile>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub device: String,
    pub streaming: bool,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub retention_days: u32,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize)]
pub struct RetentionPolicy {
    pub retention_days: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub files_removed: u64,
    pub bytes_reclaimed: u64,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize)]
pub struct ExternalStream {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// Readiness of the downstream media subsystem — consumed by handlers to
/// implement progressive readiness (§4.5 gate 4) without the pipeline
/// itself needing to know about camera-specific state.
#[async_trait]
pub trait ControllerFacade: Send + Sync {
    async fn is_ready(&self) -> bool;

    async fn list_cameras(&self) -> Result<Vec<CameraSummary>, ControllerError>;
    async fn camera_status(&self, device: &str) -> Result<CameraSummary, ControllerError>;
    async fn take_snapshot(&self, device: &str) -> Result<SnapshotResult, ControllerError>;
    async fn start_recording(&self, device: &str) -> Result<RecordingHandle, ControllerError>;
    async fn stop_recording(&self, device: &str) -> Result<RecordingHandle, ControllerError>;
    async fn list_recordings(
        &self,
        device: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<FileList, ControllerError>;
    async fn stream_url(&self, device: &str) -> Result<String, ControllerError>;
    async fn stream_status(&self, device: &str) -> Result<StreamStatus, ControllerError>;
    async fn storage_info(&self) -> Result<StorageInfo, ControllerError>;
    async fn set_retention_policy(
        &self,
        policy: RetentionPolicy,
    ) -> Result<(), ControllerError>;
    async fn cleanup_storage(&self) -> Result<CleanupResult, ControllerError>;
    async fn discover_external_streams(&self) -> Result<Vec<ExternalStream>, ControllerError>;
    async fn add_external_stream(&self, stream: ExternalStream) -> Result<(), ControllerError>;
    async fn remove_external_stream(&self, id: &str) -> Result<(), ControllerError>;
}
