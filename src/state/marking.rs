/// Record-marking sets
///
/// Two sets of image UUIDs flag images for the permanent patient record:
/// one written by the instrument (immutable here) and one by the user
/// (mutable). The combined count is capped; marking past the cap is a
/// silent policy rejection, not an error.

use std::collections::HashSet;

/// Combined instrument + user cap.
pub const MAX_RECORD_MARKS: usize = 6;

/// Outcome of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The image is now marked; notify the collaborator
    Added,
    /// The image is no longer marked; notify the collaborator
    Removed,
    /// Marking would exceed the cap; nothing changed
    CapReached,
    /// The mark belongs to the instrument and cannot be toggled
    InstrumentOwned,
}

#[derive(Debug, Clone, Default)]
pub struct RecordMarking {
    instrument: HashSet<String>,
    user: HashSet<String>,
}

impl RecordMarking {
    pub fn new(instrument: HashSet<String>) -> Self {
        Self {
            instrument,
            user: HashSet::new(),
        }
    }

    pub fn is_marked(&self, uuid: &str) -> bool {
        self.instrument.contains(uuid) || self.user.contains(uuid)
    }

    pub fn is_instrument_mark(&self, uuid: &str) -> bool {
        self.instrument.contains(uuid)
    }

    pub fn total(&self) -> usize {
        self.instrument.len() + self.user.len()
    }

    /// Flip the user mark for `uuid`. Removing always succeeds; adding is
    /// rejected once the combined count reaches the cap.
    pub fn toggle(&mut self, uuid: &str) -> MarkOutcome {
        if self.instrument.contains(uuid) {
            return MarkOutcome::InstrumentOwned;
        }
        if self.user.contains(uuid) {
            self.user.remove(uuid);
            return MarkOutcome::Removed;
        }
        if self.total() >= MAX_RECORD_MARKS {
            return MarkOutcome::CapReached;
        }
        self.user.insert(uuid.to_string());
        MarkOutcome::Added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marking_with(instrument: &[&str], user: &[&str]) -> RecordMarking {
        let mut marking =
            RecordMarking::new(instrument.iter().map(|s| s.to_string()).collect());
        for uuid in user {
            assert_eq!(marking.toggle(uuid), MarkOutcome::Added);
        }
        marking
    }

    #[test]
    fn seventh_mark_is_rejected() {
        let mut marking = marking_with(&["a", "b", "c"], &["d", "e", "f"]);
        assert_eq!(marking.total(), 6);
        assert_eq!(marking.toggle("g"), MarkOutcome::CapReached);
        assert_eq!(marking.total(), 6);
        assert!(!marking.is_marked("g"));
    }

    #[test]
    fn removing_frees_a_slot() {
        let mut marking = marking_with(&["a", "b", "c"], &["d", "e", "f"]);
        assert_eq!(marking.toggle("d"), MarkOutcome::Removed);
        assert_eq!(marking.toggle("g"), MarkOutcome::Added);
        assert!(marking.is_marked("g"));
        assert_eq!(marking.total(), 6);
    }

    #[test]
    fn instrument_marks_cannot_be_toggled() {
        let mut marking = marking_with(&["a"], &[]);
        assert_eq!(marking.toggle("a"), MarkOutcome::InstrumentOwned);
        assert!(marking.is_marked("a"));
    }

    #[test]
    fn unmark_always_allowed_at_cap() {
        let mut marking = marking_with(&[], &["a", "b", "c", "d", "e", "f"]);
        assert_eq!(marking.toggle("f"), MarkOutcome::Removed);
        assert!(!marking.is_marked("f"));
    }
}
