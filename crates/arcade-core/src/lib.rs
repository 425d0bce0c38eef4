//! Arcade Core — shared event-sourcing abstractions.
//!
//! This crate defines the fundamental traits and types that the event store,
//! the event bus, the state machine engine and every bounded context depend
//! on. It contains no infrastructure code.

pub mod aggregate;
pub mod callback;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod handler;
pub mod repository;
pub mod snapshot;
pub mod subscription;
