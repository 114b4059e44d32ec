//! Event types for the mission event system

use chrono::{DateTime, Utc};
use mission_core::{ErrorCategory, Stage, TranscriptEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Position of this event in the publishing bus's stream
    pub sequence: u64,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All possible events in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Orchestration stage changed
    #[serde(rename = "mission.stage_changed")]
    StageChanged {
        mission_id: Uuid,
        from: Stage,
        to: Stage,
    },

    /// A new entry was appended to the transcript
    #[serde(rename = "transcript.appended")]
    TranscriptAppended {
        mission_id: Uuid,
        index: usize,
        entry: TranscriptEntry,
    },

    /// The live status entry was replaced in place
    #[serde(rename = "transcript.replaced")]
    TranscriptReplaced {
        mission_id: Uuid,
        index: usize,
        entry: TranscriptEntry,
    },

    /// A receipt was persisted for a completed run
    #[serde(rename = "receipt.stored")]
    ReceiptStored {
        mission_id: Uuid,
        run_id: String,
        job_id: Option<String>,
    },

    /// The mission moved into the error stage
    #[serde(rename = "mission.error")]
    MissionError {
        mission_id: Uuid,
        category: ErrorCategory,
        message: String,
    },
}

impl Event {
    /// Get the mission ID associated with this event
    pub fn mission_id(&self) -> Uuid {
        match self {
            Event::StageChanged { mission_id, .. } => *mission_id,
            Event::TranscriptAppended { mission_id, .. } => *mission_id,
            Event::TranscriptReplaced { mission_id, .. } => *mission_id,
            Event::ReceiptStored { mission_id, .. } => *mission_id,
            Event::MissionError { mission_id, .. } => *mission_id,
        }
    }

    /// Transcript entry carried by this event, if any
    pub fn transcript_entry(&self) -> Option<(usize, &TranscriptEntry)> {
        match self {
            Event::TranscriptAppended { index, entry, .. }
            | Event::TranscriptReplaced { index, entry, .. } => Some((*index, entry)),
            _ => None,
        }
    }
}
