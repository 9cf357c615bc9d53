//! Agentry CLI library target.
//!
//! The binary in `main.rs` is a thin clap front end over these commands so
//! that integration tests can drive the same code paths.

pub mod commands;
