//! Hooks for watching flow invocations progress.

use std::sync::{Arc, Mutex};

use fete_primitives::{FlowName, InvocationId};
use tracing::info;

use crate::lifecycle::FlowState;

/// A state change recorded for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Invocation that changed state.
    pub invocation: InvocationId,
    /// Flow the invocation belongs to.
    pub flow: FlowName,
    /// State before the change.
    pub from: FlowState,
    /// State after the change.
    pub to: FlowState,
}

/// Observer invoked on every state change of every invocation.
///
/// Callers use this to drive progress indicators; implementations must not block.
pub trait FlowObserver: Send + Sync {
    /// Records a transition.
    fn on_transition(&self, transition: &Transition);
}

/// Observer that logs every transition at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFlowObserver;

impl FlowObserver for TracingFlowObserver {
    fn on_transition(&self, transition: &Transition) {
        info!(
            flow = %transition.flow,
            invocation = %transition.invocation,
            from = ?transition.from,
            to = ?transition.to,
            "flow progressed"
        );
    }
}

/// Observer that keeps every transition in memory.
#[derive(Default)]
pub struct CollectingObserver {
    transitions: Mutex<Vec<Transition>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Removes and returns the recorded transitions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<Transition> {
        let mut lock = self.transitions.lock().expect("collecting observer poisoned");
        lock.drain(..).collect()
    }

    /// Returns the visited states of `invocation`, starting with its first `from`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn path(&self, invocation: InvocationId) -> Vec<FlowState> {
        let lock = self.transitions.lock().expect("collecting observer poisoned");
        let mut path = Vec::new();
        for transition in lock.iter().filter(|t| t.invocation == invocation) {
            if path.is_empty() {
                path.push(transition.from);
            }
            path.push(transition.to);
        }
        path
    }
}

impl FlowObserver for CollectingObserver {
    fn on_transition(&self, transition: &Transition) {
        self.transitions
            .lock()
            .expect("collecting observer poisoned")
            .push(transition.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_follows_one_invocation() {
        let observer = CollectingObserver::new();
        let flow = FlowName::new("demo").unwrap();
        let first = InvocationId::random();
        let second = InvocationId::random();

        for (invocation, from, to) in [
            (first, FlowState::Idle, FlowState::Validating),
            (second, FlowState::Idle, FlowState::Validating),
            (first, FlowState::Validating, FlowState::Failed),
        ] {
            observer.on_transition(&Transition {
                invocation,
                flow: flow.clone(),
                from,
                to,
            });
        }

        assert_eq!(
            observer.path(first),
            vec![FlowState::Idle, FlowState::Validating, FlowState::Failed]
        );
        assert_eq!(observer.drain().len(), 3);
        assert!(observer.path(first).is_empty());
    }
}
