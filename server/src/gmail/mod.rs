//! Gmail-backed implementations of the engine's provider seams.

pub mod client;
pub mod history;
