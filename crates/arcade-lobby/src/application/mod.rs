//! Lobby application services.

pub mod command_handlers;
pub mod ports;
pub mod projections;
pub mod query_handlers;
pub mod repository;
