//! Shared domain primitives for the EventPulse notification core.
//!
//! Everything here is free of I/O: identifiers, timestamps, the domain
//! error type, role names and the runtime configuration structs that the
//! store, fan-out and integrity crates are parameterised with.

pub mod config;
pub mod error;
pub mod ids;
pub mod roles;
pub mod types;
