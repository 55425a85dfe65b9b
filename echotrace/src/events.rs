//! Events reported by the render thread

use crate::world::SourceId;

#[derive(Debug, Clone, PartialEq)]
pub enum EchoTraceEvent {
    SourceStarted {
        source_id: SourceId,
    },
    SourceStopped {
        source_id: SourceId,
    },
    SourceCompleted {
        source_id: SourceId,
    },
    SourceLooped {
        source_id: SourceId,
        loop_count: u32,
    },
    /// The render thread had no room for another clip
    SourceRejected {
        source_id: SourceId,
    },
    /// A command named a clip the render thread does not know
    UnknownSource {
        source_id: SourceId,
    },
    /// The renderer switched to a newer path set
    SnapshotAdopted {
        version: u64,
        paths: usize,
    },
    /// Valid paths beyond the renderer's capacity were not rendered
    PathsTruncated {
        version: u64,
        dropped: usize,
    },
    EngineStarted,
    EngineStopped,
    EngineError {
        error: String,
    },
}

impl EchoTraceEvent {
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            Self::SourceStarted { source_id }
            | Self::SourceStopped { source_id }
            | Self::SourceCompleted { source_id }
            | Self::SourceLooped { source_id, .. }
            | Self::SourceRejected { source_id }
            | Self::UnknownSource { source_id } => Some(*source_id),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SourceRejected { .. }
                | Self::UnknownSource { .. }
                | Self::PathsTruncated { .. }
                | Self::EngineError { .. }
        )
    }

    pub fn is_source_event(&self) -> bool {
        self.source_id().is_some()
    }
}
