//! Floe CLI - command-line interface for the Floe migration engine.
//!
//! This crate provides the `floe` binary for applying version-ordered
//! schema migrations to ClickHouse and inspecting their status.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
