//! State machine error types.

use std::fmt;

use thiserror::Error;

use crate::config::HookError;

/// The step of a transition that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// The source state's `on_exit` hook.
    Exit,
    /// The transition's action.
    Action,
    /// The target state's `on_enter` hook.
    Enter,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exit => "on_exit",
            Self::Action => "action",
            Self::Enter => "on_enter",
        })
    }
}

/// Errors raised by configuration validation and by transitions.
#[derive(Debug, Error)]
pub enum StateMachineError {
    /// A state referenced by the configuration or a restore was never
    /// registered.
    #[error("unknown state: {0}")]
    UnknownState(String),

    /// The same state was registered twice.
    #[error("state registered twice: {0}")]
    DuplicateState(String),

    /// A hook or action failed.
    ///
    /// For [`HookPhase::Exit`] and [`HookPhase::Action`] the machine is still
    /// in `from`. For [`HookPhase::Enter`] it is in `to` and faulted.
    #[error("{phase} failed during {from} -> {to} on {trigger}: {source}")]
    Hook {
        /// Failed step.
        phase: HookPhase,
        /// Source state.
        from: String,
        /// Target state.
        to: String,
        /// Event name, or `reset`.
        trigger: String,
        /// The hook's error.
        #[source]
        source: HookError,
    },

    /// A previous `on_enter` failure left the machine faulted; only `reset`
    /// is accepted.
    #[error("state machine faulted in state {state}; reset required")]
    Faulted {
        /// The state the machine was left in.
        state: String,
    },
}

impl StateMachineError {
    /// Returns the failed phase for hook errors.
    #[must_use]
    pub fn phase(&self) -> Option<HookPhase> {
        match self {
            Self::Hook { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
