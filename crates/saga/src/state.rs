//! Saga state machine.

use serde::{Deserialize, Serialize};

/// What a state means to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// The next forward step to execute.
    Forward,
    /// The next compensating action to run.
    Compensation,
    /// The saga makes no further transitions.
    Terminal,
}

/// The state of an order-placement saga.
///
/// State transitions:
/// ```text
/// DecreasingStock ──┬──► CreatingPayment ──┬──► Completed
///                   │                      └──► IncreasingStock ──► Cancelled
///                   └──► Cancelled
/// ```
///
/// `Failed` is reached only when the engine detects a defect (an illegal
/// transition or an unregistered state), never through a business failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Stock for the order's items is being taken out of inventory.
    #[default]
    DecreasingStock,

    /// The order total is looked up and a payment is created.
    CreatingPayment,

    /// Stock taken out earlier is being put back (compensation).
    IncreasingStock,

    /// Every step succeeded (terminal state).
    Completed,

    /// A step failed and completed steps were compensated (terminal state).
    Cancelled,

    /// The run hit a defect and was aborted after compensation (terminal state).
    Failed,
}

impl SagaState {
    /// The state every saga starts in.
    pub const INITIAL: SagaState = SagaState::DecreasingStock;

    /// Every state, in declaration order.
    pub const ALL: [SagaState; 6] = [
        SagaState::DecreasingStock,
        SagaState::CreatingPayment,
        SagaState::IncreasingStock,
        SagaState::Completed,
        SagaState::Cancelled,
        SagaState::Failed,
    ];

    /// Returns the kind of this state.
    pub fn kind(&self) -> StateKind {
        match self {
            SagaState::DecreasingStock | SagaState::CreatingPayment => StateKind::Forward,
            SagaState::IncreasingStock => StateKind::Compensation,
            SagaState::Completed | SagaState::Cancelled | SagaState::Failed => StateKind::Terminal,
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.kind() == StateKind::Terminal
    }

    /// Returns true if the saga ends successfully in this state.
    pub fn is_success(&self) -> bool {
        matches!(self, SagaState::Completed)
    }

    /// States a step is allowed to move the saga to from this state.
    pub fn allowed_transitions(&self) -> &'static [SagaState] {
        match self {
            SagaState::DecreasingStock => &[SagaState::CreatingPayment, SagaState::Cancelled],
            SagaState::CreatingPayment => &[SagaState::Completed, SagaState::IncreasingStock],
            SagaState::IncreasingStock => &[SagaState::Cancelled],
            SagaState::Completed | SagaState::Cancelled | SagaState::Failed => &[],
        }
    }

    /// Returns true if `next` is reachable from this state in one step.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::DecreasingStock => "DecreasingStock",
            SagaState::CreatingPayment => "CreatingPayment",
            SagaState::IncreasingStock => "IncreasingStock",
            SagaState::Completed => "Completed",
            SagaState::Cancelled => "Cancelled",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
