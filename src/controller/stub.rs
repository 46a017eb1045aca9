//! In-memory reference implementation of `ControllerFacade`. This is the
//! crate's runnable default and the implementation exercised by the
//! integration tests — a real deployment plugs in a facade that talks to
//! the actual camera/media subsystem instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    CameraSummary, CleanupResult, ControllerError, ControllerFacade, ExternalStream, FileList,
    RecordingFile, RecordingHandle, RetentionPolicy, SnapshotResult, StorageInfo, StreamStatus,
};

struct CameraState {
    name: String,
    connected: bool,
    recording: bool,
    recording_started_at: Option<String>,
}

pub struct StubController {
    ready: AtomicBool,
    cameras: RwLock<HashMap<String, CameraState>>,
    recordings: RwLock<Vec<RecordingFile>>,
    retention_days: RwLock<u32>,
    external_streams: RwLock<Vec<ExternalStream>>,
}

impl StubController {
    pub fn new() -> Self {
        let mut cameras = HashMap::new();
        cameras.insert(
            "camera0".to_string(),
            CameraState {
                name: "Front door".to_string(),
                connected: true,
                recording: false,
                recording_started_at: None,
            },
        );
        cameras.insert(
            "camera1".to_string(),
            CameraState {
                name: "Driveway".to_string(),
                connected: true,
                recording: false,
                recording_started_at: None,
            },
        );
        Self {
            ready: AtomicBool::new(true),
            cameras: RwLock::new(cameras),
            recordings: RwLock::new(Vec::new()),
            retention_days: RwLock::new(30),
            external_streams: RwLock::new(Vec::new()),
        }
    }

    /// Used by startup/tests to simulate the gateway coming up before the
    /// media subsystem has finished enumerating cameras.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

impl Default for StubController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControllerFacade for StubController {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn list_cameras(&self) -> Result<Vec<CameraSummary>, ControllerError> {
        let cameras = self.cameras.read().await;
        Ok(cameras
            .iter()
            .map(|(device, state)| CameraSummary {
                device: device.clone(),
                name: state.name.clone(),
                connected: state.connected,
                status: if state.connected { "connected" } else { "disconnected" }.to_string(),
            })
            .collect())
    }

    async fn camera_status(&self, device: &str) -> Result<CameraSummary, ControllerError> {
        let cameras = self.cameras.read().await;
        let state = cameras
            .get(device)
            .ok_or_else(|| ControllerError::CameraNotFound(device.to_string()))?;
        Ok(CameraSummary {
            device: device.to_string(),
            name: state.name.clone(),
            connected: state.connected,
            status: if state.connected { "connected" } else { "disconnected" }.to_string(),
        })
    }

    async fn take_snapshot(&self, device: &str) -> Result<SnapshotResult, ControllerError> {
        let cameras = self.cameras.read().await;
        if !cameras.contains_key(device) {
            return Err(ControllerError::CameraNotFound(device.to_string()));
        }
        Ok(SnapshotResult {
            device: device.to_string(),
            path: format!("/snapshots/{device}-{}.jpg", Utc::now().timestamp()),
            taken_at: Utc::now().to_rfc3339(),
        })
    }

    async fn start_recording(&self, device: &str) -> Result<RecordingHandle, ControllerError> {
        let mut cameras = self.cameras.write().await;
        let state = cameras
            .get_mut(device)
            .ok_or_else(|| ControllerError::CameraNotFound(device.to_string()))?;
        state.recording = true;
        state.recording_started_at = Some(Utc::now().to_rfc3339());
        Ok(RecordingHandle {
            device: device.to_string(),
            recording: true,
            started_at: state.recording_started_at.clone(),
        })
    }

    async fn stop_recording(&self, device: &str) -> Result<RecordingHandle, ControllerError> {
        let mut cameras = self.cameras.write().await;
        let state = cameras
            .get_mut(device)
            .ok_or_else(|| ControllerError::CameraNotFound(device.to_string()))?;
        state.recording = false;
        let started_at = state.recording_started_at.take();
        self.recordings.write().await.push(RecordingFile {
            device: device.to_string(),
            path: format!("/recordings/{device}-{}.mp4", Utc::now().timestamp()),
            size_bytes: 0,
            created_at: Utc::now().to_rfc3339(),
        });
        Ok(RecordingHandle {
            device: device.to_string(),
            recording: false,
            started_at,
        })
    }

    async fn list_recordings(
        &self,
        device: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<FileList, ControllerError> {
        let recordings = self.recordings.read().await;
        let filtered: Vec<RecordingFile> = recordings
            .iter()
            .filter(|r| device.map(|d| d == r.device).unwrap_or(true))
            .cloned()
            .collect();
        let total = filtered.len();
        let page = filtered
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(FileList { files: page, total })
    }

    async fn stream_url(&self, device: &str) -> Result<String, ControllerError> {
        let cameras = self.cameras.read().await;
        if !cameras.contains_key(device) {
            return Err(ControllerError::CameraNotFound(device.to_string()));
        }
        Ok(format!("rtsp://127.0.0.1:8554/{device}"))
    }

    async fn stream_status(&self, device: &str) -> Result<StreamStatus, ControllerError> {
        let cameras = self.cameras.read().await;
        let state = cameras
            .get(device)
            .ok_or_else(|| ControllerError::CameraNotFound(device.to_string()))?;
        Ok(StreamStatus {
            device: device.to_string(),
            streaming: state.connected,
            url: state
                .connected
                .then(|| format!("rtsp://127.0.0.1:8554/{device}")),
        })
    }

    async fn storage_info(&self) -> Result<StorageInfo, ControllerError> {
        Ok(StorageInfo {
            total_bytes: 1_000_000_000_000,
            used_bytes: 0,
            available_bytes: 1_000_000_000_000,
            retention_days: *self.retention_days.read().await,
        })
    }

    async fn set_retention_policy(&self, policy: RetentionPolicy) -> Result<(), ControllerError> {
        *self.retention_days.write().await = policy.retention_days;
        Ok(())
    }

    async fn cleanup_storage(&self) -> Result<CleanupResult, ControllerError> {
        let mut recordings = self.recordings.write().await;
        let removed = recordings.len() as u64;
        recordings.clear();
        Ok(CleanupResult {
            files_removed: removed,
            bytes_reclaimed: 0,
        })
    }

    async fn discover_external_streams(&self) -> Result<Vec<ExternalStream>, ControllerError> {
        Ok(self.external_streams.read().await.clone())
    }

    async fn add_external_stream(&self, stream: ExternalStream) -> Result<(), ControllerError> {
        self.external_streams.write().await.push(stream);
        Ok(())
    }

    async fn remove_external_stream(&self, id: &str) -> Result<(), ControllerError> {
        let mut streams = self.external_streams.write().await;
        let before = streams.len();
        streams.retain(|s| s.id != id);
        if streams.len() == before {
            return Err(ControllerError::Unsupported(format!(
                "no external stream with id {id}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_camera_yields_camera_not_found() {
        let controller = StubController::new();
        let err = controller.camera_status("no-such-camera").await.unwrap_err();
        assert!(matches!(err, ControllerError::CameraNotFound(_)));
    }

    #[tokio::test]
    async fn start_then_stop_recording_round_trips() {
        let controller = StubController::new();
        let started = controller.start_recording("camera0").await.unwrap();
        assert!(started.recording);
        let stopped = controller.stop_recording("camera0").await.unwrap();
        assert!(!stopped.recording);
        let files = controller.list_recordings(None, 10, 0).await.unwrap();
        assert_eq!(files.total, 1);
    }
}
