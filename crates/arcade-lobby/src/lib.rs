//! Arcade — Lobby bounded context.
//!
//! Responsible for lobby creation, seating players, the waiting/ready/full
//! lifecycle, and handing a full or ready lobby over to a game.

pub mod application;
pub mod domain;
