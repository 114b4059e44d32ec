use events::{Event, EventBus};
use mission_client::HistoryMessage;
use mission_core::{StatusResult, TranscriptEntry};
use uuid::Uuid;

/// Ordered interaction log of one mission.
///
/// Entries are append-only. The one exception is the live status entry of
/// the current run, which each poll replaces in place.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    live_status: Option<usize>,
    publisher: Option<(EventBus, Uuid)>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish every append and replacement on `bus`, tagged with `mission_id`.
    pub fn with_publisher(mut self, bus: EventBus, mission_id: Uuid) -> Self {
        self.publisher = Some((bus, mission_id));
        self
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: TranscriptEntry) -> usize {
        let index = self.entries.len();
        if let Some((bus, mission_id)) = &self.publisher {
            bus.publish(Event::TranscriptAppended {
                mission_id: *mission_id,
                index,
                entry: entry.clone(),
            });
        }
        self.entries.push(entry);
        index
    }

    /// Replace the live status entry, or append one if the current run has
    /// none yet.
    pub fn upsert_status(&mut self, status: StatusResult) -> usize {
        let entry = TranscriptEntry::Status { status };

        match self.live_status {
            Some(index) if index < self.entries.len() => {
                if let Some((bus, mission_id)) = &self.publisher {
                    bus.publish(Event::TranscriptReplaced {
                        mission_id: *mission_id,
                        index,
                        entry: entry.clone(),
                    });
                }
                self.entries[index] = entry;
                index
            }
            _ => {
                let index = self.push(entry);
                self.live_status = Some(index);
                index
            }
        }
    }

    /// Start tracking a new run. The previous run's status entry is frozen.
    pub fn begin_run(&mut self) {
        self.live_status = None;
    }

    pub fn status_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_status()).count()
    }

    /// Text entries as plan request history.
    pub fn text_history(&self) -> Vec<HistoryMessage> {
        self.entries
            .iter()
            .filter_map(TranscriptEntry::as_text)
            .map(|(role, content)| HistoryMessage {
                role,
                content: content.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_core::{Role, RunState};

    #[test]
    fn test_push_returns_indices() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.push(TranscriptEntry::user("hello")), 0);
        assert_eq!(transcript.push(TranscriptEntry::assistant("hi")), 1);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_upsert_status_replaces_live_entry() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::user("go"));

        let first = transcript.upsert_status(StatusResult::new(RunState::Running));
        let second = transcript
            .upsert_status(StatusResult::new(RunState::Running).with_step("uploading"));
        assert_eq!(first, second);
        assert_eq!(transcript.status_count(), 1);

        match transcript.last() {
            Some(TranscriptEntry::Status { status }) => {
                assert_eq!(status.current_step.as_deref(), Some("uploading"));
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_begin_run_freezes_previous_status() {
        let mut transcript = Transcript::new();
        transcript.upsert_status(StatusResult::new(RunState::Failed));
        transcript.begin_run();
        transcript.upsert_status(StatusResult::new(RunState::Running));
        assert_eq!(transcript.status_count(), 2);
    }

    #[test]
    fn test_text_history_skips_structured_entries() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::user("label images"));
        transcript.upsert_status(StatusResult::new(RunState::Running));
        transcript.push(TranscriptEntry::assistant("which deadline?"));

        let history = transcript.text_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "which deadline?");
    }

    #[tokio::test]
    async fn test_publishes_appends_and_replacements() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mission_id = Uuid::new_v4();
        let mut transcript = Transcript::new().with_publisher(bus, mission_id);

        transcript.upsert_status(StatusResult::new(RunState::Pending));
        transcript.upsert_status(StatusResult::new(RunState::Running));

        let appended = rx.recv().await.unwrap();
        assert!(matches!(
            appended.event,
            Event::TranscriptAppended { index: 0, .. }
        ));
        let replaced = rx.recv().await.unwrap();
        assert!(matches!(
            replaced.event,
            Event::TranscriptReplaced { index: 0, .. }
        ));
        assert_eq!(replaced.event.mission_id(), mission_id);
    }
}
