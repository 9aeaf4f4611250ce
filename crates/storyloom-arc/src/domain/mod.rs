//! Domain layer for the Story Arc context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod types;
