/// Pagination sequence state definitions
///
/// Every pagination sequence (course listing, subject area index, one
/// subject area's program listing) walks this state machine.
use std::fmt;

/// Represents the current state of a pagination sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceState {
    // ===== Active States =====
    /// A page request is in flight (or waiting on the throttle)
    Fetching,

    /// The fetched page is being turned into records
    Extracting,

    /// Records were folded in; deciding whether a next page exists
    Advancing,

    // ===== Terminal States =====
    /// The last page carried no next-page reference
    Done,

    /// A fetch failed and the sequence stopped
    Aborted,
}

impl SequenceState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// | From       | To                      |
    /// |------------|-------------------------|
    /// | Fetching   | Extracting, Aborted     |
    /// | Extracting | Advancing               |
    /// | Advancing  | Fetching, Done          |
    pub fn can_transition_to(&self, next: SequenceState) -> bool {
        matches!(
            (self, next),
            (Self::Fetching, Self::Extracting)
                | (Self::Fetching, Self::Aborted)
                | (Self::Extracting, Self::Advancing)
                | (Self::Advancing, Self::Fetching)
                | (Self::Advancing, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Advancing => "advancing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
