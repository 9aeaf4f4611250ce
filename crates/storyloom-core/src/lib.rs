//! Storyloom Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the story-arc
//! context depends on: aggregates, events, time, persistence and the
//! narrative generation port. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod generation;
pub mod repository;
