//! Filesystem utilities for sdgflow.
//!
//! Session state must never be observed half-written, so every state file
//! goes through [`atomic_write`].

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_json};
