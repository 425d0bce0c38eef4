//! Lobby domain model.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod lifecycle;
