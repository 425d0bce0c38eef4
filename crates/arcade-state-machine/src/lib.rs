//! Arcade State Machine — generic guarded transition engine.
//!
//! A [`StateMachineConfig`] is built once per aggregate kind and shared via
//! `Arc`; each aggregate instance owns a [`StateMachine`] holding its current
//! state and context.

pub mod config;
pub mod error;
pub mod machine;

pub use config::{
    Action, Guard, Hook, HookError, Label, StateDefinition, StateMachineConfig,
    StateMachineConfigBuilder, TransitionDefinition,
};
pub use error::{HookPhase, StateMachineError};
pub use machine::{StateMachine, TransitionNotice, Trigger};
