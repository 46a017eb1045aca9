//! The closed set of event topics (§6). New topics are a protocol change,
//! not a runtime registration — mirrors `policy::rbac::AgentRole`'s closed
//! enum shape in the teacher.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CameraConnected,
    CameraDisconnected,
    CameraStatusChange,
    CameraCapabilityDetected,
    CameraCapabilityError,
    RecordingStart,
    RecordingStop,
    RecordingProgress,
    RecordingError,
    SnapshotTaken,
    SnapshotError,
    SystemStartup,
    SystemShutdown,
    SystemHealth,
    SystemError,
    MediamtxStream,
    MediamtxPath,
    MediamtxError,
    MediamtxRecordingStarted,
    MediamtxRecordingStopped,
    MediamtxStreamStarted,
    MediamtxStreamStopped,
}

impl Topic {
    pub const ALL: &'static [Topic] = &[
        Topic::CameraConnected,
        Topic::CameraDisconnected,
        Topic::CameraStatusChange,
        Topic::CameraCapabilityDetected,
        Topic::CameraCapabilityError,
        Topic::RecordingStart,
        Topic::RecordingStop,
        Topic::RecordingProgress,
        Topic::RecordingError,
        Topic::SnapshotTaken,
        Topic::SnapshotError,
        Topic::SystemStartup,
        Topic::SystemShutdown,
        Topic::SystemHealth,
        Topic::SystemError,
        Topic::MediamtxStream,
        Topic::MediamtxPath,
        Topic::MediamtxError,
        Topic::MediamtxRecordingStarted,
        Topic::MediamtxRecordingStopped,
        Topic::MediamtxStreamStarted,
        Topic::MediamtxStreamStopped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::CameraConnected => "camera.connected",
            Topic::CameraDisconnected => "camera.disconnected",
            Topic::CameraStatusChange => "camera.status_change",
            Topic::CameraCapabilityDetected => "camera.capability_detected",
            Topic::CameraCapabilityError => "camera.capability_error",
            Topic::RecordingStart => "recording.start",
            Topic::RecordingStop => "recording.stop",
            Topic::RecordingProgress => "recording.progress",
            Topic::RecordingError => "recording.error",
            Topic::SnapshotTaken => "snapshot.taken",
            Topic::SnapshotError => "snapshot.error",
            Topic::SystemStartup => "system.startup",
            Topic::SystemShutdown => "system.shutdown",
            Topic::SystemHealth => "system.health",
            Topic::SystemError => "system.error",
            Topic::MediamtxStream => "mediamtx.stream",
            Topic::MediamtxPath => "mediamtx.path",
            Topic::MediamtxError => "mediamtx.error",
            Topic::MediamtxRecordingStarted => "mediamtx.recording_started",
            Topic::MediamtxRecordingStopped => "mediamtx.recording_stopped",
            Topic::MediamtxStreamStarted => "mediamtx.stream_started",
            Topic::MediamtxStreamStopped => "mediamtx.stream_stopped",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_topic() {
        for topic in Topic::ALL {
            let s = topic.as_str();
            assert_eq!(Topic::from_str(s).unwrap(), *topic);
        }
    }

    #[test]
    fn rejects_unknown_topic() {
        assert!(Topic::from_str("not.a.topic").is_err());
    }
}
