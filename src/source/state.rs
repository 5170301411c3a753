//! Source state management

/// Source lifecycle
///
/// `Created -> Started -> (Running | Failed) -> Destroyed`. A source that
/// has produced frames can still fail later, a failed one never recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Resources are being acquired
    ///
    /// Only exists inside `Source::create_with`, which either returns a
    /// started source or unwinds. [`crate::Source::state`] never reports it.
    Created,

    /// The streaming worker is up, no frame has been grabbed yet
    Started,

    /// At least one frame has been grabbed
    Running,

    /// The pipeline reported an error. Grabs return it until destruction
    Failed,

    /// All resources have been released
    Destroyed,
}

impl SourceState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &SourceState) -> bool {
        use SourceState::*;

        match (self, target) {
            (Created, Started) => true,
            // construction failures unwind straight to Destroyed
            (Created, Destroyed) => true,

            (Started, Running) => true,
            (Started, Failed) => true,
            (Started, Destroyed) => true,

            (Running, Failed) => true,
            (Running, Destroyed) => true,

            (Failed, Destroyed) => true,

            (Destroyed, _) => false,

            (a, b) if a == b => true,

            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            SourceState::Created => "Created",
            SourceState::Started => "Started",
            SourceState::Running => "Running",
            SourceState::Failed => "Failed",
            SourceState::Destroyed => "Destroyed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceState::Failed)
    }
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
