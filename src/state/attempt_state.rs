/// Download attempt states for one (record, file type) pair
///
/// ```text
/// Pending ──accept──▶ Accepted
///    │
///    └──fail──▶ Retrying ──resume──▶ Pending
///    └──fail (budget spent)──▶ Exhausted
/// ```
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptState {
    /// A request is about to be (or is being) issued
    Pending,

    /// The last request failed and another one is allowed after a backoff
    Retrying,

    /// A response was classified as a document and saved
    Accepted,

    /// Every allowed attempt failed
    Exhausted,
}

impl AttemptState {
    /// Accepted and Exhausted end the attempt sequence for a type
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Exhausted)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: AttemptState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Retrying)
                | (Self::Pending, Self::Exhausted)
                | (Self::Retrying, Self::Pending)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retrying => "retrying",
            Self::Accepted => "accepted",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks attempts for one type against a fixed budget
///
/// `max_attempts` counts the initial request, so a retry budget of `n`
/// gives `n + 1` attempts.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    state: AttemptState,
    attempt: u32,
    max_attempts: u32,
    last_error: Option<String>,
}

impl AttemptTracker {
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: AttemptState::Pending,
            attempt: 0,
            max_attempts: max_retries + 1,
            last_error: None,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Zero-based index of the attempt in flight
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Marks the in-flight attempt as accepted
    pub fn accept(&mut self) {
        self.move_to(AttemptState::Accepted);
    }

    /// Records a failed attempt and returns the resulting state
    ///
    /// The result is `Retrying` while attempts remain, `Exhausted` otherwise.
    pub fn fail(&mut self, error: impl Into<String>) -> AttemptState {
        self.last_error = Some(error.into());
        if self.attempt + 1 < self.max_attempts {
            self.move_to(AttemptState::Retrying);
        } else {
            self.move_to(AttemptState::Exhausted);
        }
        self.state
    }

    /// Starts the next attempt after a backoff
    pub fn resume(&mut self) {
        self.move_to(AttemptState::Pending);
        self.attempt += 1;
    }

    fn move_to(&mut self, next: AttemptState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid attempt transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}
