//! Per-invocation state machine for flows.

use fete_primitives::InvocationId;
use thiserror::Error;
use tracing::debug;

/// States a single flow invocation moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    /// Invocation created, nothing checked yet.
    Idle,
    /// Input is being checked against the request schema.
    Validating,
    /// Validated input is being rendered into a prompt.
    Rendering,
    /// The prompt is with the generation backend.
    AwaitingBackend,
    /// The backend result is being parsed and checked.
    ValidatingOutput,
    /// A validated output was produced.
    Done,
    /// The invocation failed; the error was returned to the caller.
    Failed,
}

impl FlowState {
    /// Returns `true` for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Events that trigger state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// Begin checking the input.
    Start,
    /// Input conforms to the request schema.
    InputAccepted,
    /// Prompt text was produced.
    PromptRendered,
    /// The backend returned text.
    BackendResponded,
    /// Output conforms to the response schema.
    OutputAccepted,
    /// Any step failed.
    Fail,
}

/// Lifecycle tracker for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    invocation: InvocationId,
    state: FlowState,
}

impl Lifecycle {
    /// Creates a tracker in the `Idle` state.
    #[must_use]
    pub const fn new(invocation: InvocationId) -> Self {
        Self {
            invocation,
            state: FlowState::Idle,
        }
    }

    /// Returns the invocation this tracker belongs to.
    #[must_use]
    pub const fn invocation(&self) -> InvocationId {
        self.invocation
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    /// Applies an event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the event is not
    /// allowed from the current state. Terminal states accept no events.
    pub fn transition(&mut self, event: FlowEvent) -> LifecycleResult<FlowState> {
        let next = match (self.state, event) {
            (FlowState::Idle, FlowEvent::Start) => Some(FlowState::Validating),
            (FlowState::Validating, FlowEvent::InputAccepted) => Some(FlowState::Rendering),
            (FlowState::Rendering, FlowEvent::PromptRendered) => Some(FlowState::AwaitingBackend),
            (FlowState::AwaitingBackend, FlowEvent::BackendResponded) => {
                Some(FlowState::ValidatingOutput)
            }
            (FlowState::ValidatingOutput, FlowEvent::OutputAccepted) => Some(FlowState::Done),
            (state, FlowEvent::Fail) if !state.is_terminal() => Some(FlowState::Failed),
            _ => None,
        };

        let Some(next_state) = next else {
            return Err(LifecycleError::InvalidTransition {
                invocation: self.invocation,
                from: self.state,
                event,
            });
        };

        debug!(
            invocation = %self.invocation,
            from = ?self.state,
            to = ?next_state,
            ?event,
            "flow transition"
        );
        self.state = next_state;
        Ok(next_state)
    }
}

/// Errors emitted by the lifecycle tracker.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Transition was not permitted from the current state.
    #[error("invalid flow transition from {from:?} via {event:?} for invocation {invocation}")]
    InvalidTransition {
        /// Invocation whose transition failed.
        invocation: InvocationId,
        /// State prior to the attempted transition.
        from: FlowState,
        /// Event that triggered the failure.
        event: FlowEvent,
    },
}

/// Result alias used for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> Lifecycle {
        Lifecycle::new(InvocationId::random())
    }

    #[test]
    fn happy_path_reaches_done() {
        let mut lifecycle = lifecycle();
        assert_eq!(lifecycle.state(), FlowState::Idle);

        for (event, expected) in [
            (FlowEvent::Start, FlowState::Validating),
            (FlowEvent::InputAccepted, FlowState::Rendering),
            (FlowEvent::PromptRendered, FlowState::AwaitingBackend),
            (FlowEvent::BackendResponded, FlowState::ValidatingOutput),
            (FlowEvent::OutputAccepted, FlowState::Done),
        ] {
            assert_eq!(lifecycle.transition(event).unwrap(), expected);
        }
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn fail_is_reachable_from_every_active_state() {
        let steps = [
            FlowEvent::Start,
            FlowEvent::InputAccepted,
            FlowEvent::PromptRendered,
            FlowEvent::BackendResponded,
        ];
        for depth in 0..=steps.len() {
            let mut lifecycle = lifecycle();
            for event in &steps[..depth] {
                lifecycle.transition(*event).unwrap();
            }
            assert_eq!(
                lifecycle.transition(FlowEvent::Fail).unwrap(),
                FlowState::Failed
            );
        }
    }

    #[test]
    fn terminal_states_reject_events() {
        let mut lifecycle = lifecycle();
        lifecycle.transition(FlowEvent::Fail).unwrap();
        let err = lifecycle
            .transition(FlowEvent::Fail)
            .expect_err("failed is terminal");
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: FlowState::Failed,
                ..
            }
        ));
        assert!(lifecycle.transition(FlowEvent::Start).is_err());
    }

    #[test]
    fn steps_cannot_be_skipped() {
        let mut lifecycle = lifecycle();
        lifecycle.transition(FlowEvent::Start).unwrap();
        let err = lifecycle
            .transition(FlowEvent::PromptRendered)
            .expect_err("rendering before validation");
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: FlowState::Validating,
                event: FlowEvent::PromptRendered,
                ..
            }
        ));
        assert_eq!(lifecycle.state(), FlowState::Validating);
    }
}
