//! Application layer for the Story Arc context.

pub mod command_handlers;
pub mod generation;
pub mod progression;
pub mod query_handlers;
pub mod suggestions;
pub mod validation;
