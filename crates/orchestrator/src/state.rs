//! Order creation state machine.

/// Progress of one order creation attempt.
///
/// State transitions:
/// ```text
/// Validating ──► CheckingInventory ──► ProcessingPayment ──► Creating ──► Done
///      │                 │                     │                │
///      └─────────────────┴─────────┬───────────┴────────────────┘
///                                  ▼
///                              Rejected
/// ```
///
/// Rejection never rolls back earlier steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderState {
    /// Request body is being checked. No downstream call has been made.
    #[default]
    Validating,

    /// Waiting on the inventory service.
    CheckingInventory,

    /// Waiting on the payment service.
    ProcessingPayment,

    /// Generating the identifier and storing the record.
    Creating,

    /// The record is stored (terminal state).
    Done,

    /// The attempt failed (terminal state).
    Rejected,
}

impl OrderState {
    /// The state reached when the current step succeeds.
    ///
    /// Terminal states have no successor.
    pub fn next(&self) -> Option<OrderState> {
        match self {
            OrderState::Validating => Some(OrderState::CheckingInventory),
            OrderState::CheckingInventory => Some(OrderState::ProcessingPayment),
            OrderState::ProcessingPayment => Some(OrderState::Creating),
            OrderState::Creating => Some(OrderState::Done),
            OrderState::Done | OrderState::Rejected => None,
        }
    }

    /// Returns true if the attempt may still be rejected from this state.
    pub fn can_reject(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Done | OrderState::Rejected)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Validating => "Validating",
            OrderState::CheckingInventory => "CheckingInventory",
            OrderState::ProcessingPayment => "ProcessingPayment",
            OrderState::Creating => "Creating",
            OrderState::Done => "Done",
            OrderState::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
