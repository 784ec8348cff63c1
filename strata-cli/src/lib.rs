//! strata CLI - Command-line runner for group-based SQL migrations.
//!
//! This crate provides the `strata` binary, which reads a configuration file,
//! opens the SQLite history store and drives the migration engine.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
