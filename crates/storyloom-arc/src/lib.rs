//! Storyloom — Story Arc bounded context.
//!
//! Responsible for the story arc aggregate (beats, character milestones,
//! world-state changes and quest links), chapter and act advancement
//! eligibility, and the consistency validator that scores an arc.

pub mod application;
pub mod config;
pub mod domain;
